//! Constants for the NatNet wire protocol

// Packet IDs
pub const NAT_PING: u16 = 0; // Client handshake
pub const NAT_PINGRESPONSE: u16 = 1; // Server name + versions
pub const NAT_REQUEST: u16 = 2; // Free-form command string
pub const NAT_RESPONSE: u16 = 3; // Answer to NAT_REQUEST
pub const NAT_REQUEST_MODELDEF: u16 = 4; // Ask for the scene description
pub const NAT_MODELDEF: u16 = 5; // Scene description
pub const NAT_REQUEST_FRAMEOFDATA: u16 = 6; // Ask for a single frame
pub const NAT_FRAMEOFDATA: u16 = 7; // Frame data (polled or streamed)
pub const NAT_MESSAGESTRING: u16 = 8; // Server log message
pub const NAT_UNRECOGNIZED_REQUEST: u16 = 100; // Server did not understand a request

// Dataset types in model definitions
pub const DATASET_MARKERSET: i32 = 0;
pub const DATASET_RIGIDBODY: i32 = 1;
pub const DATASET_SKELETON: i32 = 2;
pub const DATASET_FORCEPLATE: i32 = 3;

// Framing
pub const HEADER_SIZE: usize = 4; // u16 id + u16 payload length
pub const MAX_PACKET_SIZE: usize = 10_000; // Largest datagram the server sends
pub const MAX_NAMELENGTH: usize = 256; // Fixed name field in ping/ping response
pub const MAX_CLIENT_NAME: usize = 128; // Longest client name sent in a ping

// Field sizes
pub const MARKER_POSITION_SIZE: usize = 12; // 3 x f32
pub const LABELED_MARKER_SIZE: usize = 20; // id + 3 x f32 + size
pub const LABELED_MARKER_PARAMS_SIZE: usize = 2; // Flags added in 2.6
pub const FORCEPLATE_RESERVED_SIZE: usize = 652; // Calibration matrix, corners, origin
pub const TIMECODE_SIZE: usize = 8; // Timecode + subframe

// Rigid body / skeleton bone tracking state (2.6+)
pub const FLAG_TRACKING_VALID: u16 = 0x01;

// Frames this many behind the current one are playback loops, not stale packets
pub const STALE_FRAME_WINDOW: i32 = 10;

// Protocol version announced by this client
pub const CLIENT_NATNET_VERSION: [u8; 4] = [2, 9, 0, 0];

// Ad-hoc request strings
pub const CMD_DATA_STREAM_ADDRESS: &str = "getDataStreamAddress";
pub const CMD_FRAMERATE: &str = "getFramerate";
