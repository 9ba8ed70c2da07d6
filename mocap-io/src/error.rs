//! Error types for mocap-io

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mocap-io error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Operation requires an active connection
    #[error("Not connected")]
    NotConnected,

    /// Server did not answer a request
    #[error("No {0} received from server")]
    NoResponse(&'static str),

    /// Header length does not match the datagram size
    #[error("Malformed packet: id {id}, declared {declared} payload bytes, received {received}")]
    MalformedPacket {
        /// Packet id from the header
        id: u16,
        /// Payload length from the header
        declared: usize,
        /// Payload bytes actually received
        received: usize,
    },

    /// Payload ended before a field could be read
    #[error("Truncated payload: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes required by the field
        needed: usize,
        /// Bytes left in the payload
        remaining: usize,
    },

    /// Invalid packet contents
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Server rejected a request
    #[error("Server did not recognize the request")]
    UnrecognizedRequest,

    /// Too many consecutive control channel failures
    #[error("Too many consecutive errors ({0}), connection closed")]
    TooManyErrors(u32),

    /// Host or data stream address could not be resolved
    #[error("Address resolution failed: {0}")]
    AddressResolution(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
