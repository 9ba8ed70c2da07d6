//! NatNet wire protocol
//!
//! ## Framing
//!
//! Every datagram starts with a 4-byte little-endian header:
//!
//! ```text
//! ┌──────────────┬──────────────────┬─────────────────────────┐
//! │ id (u16, LE) │ length (u16, LE) │ payload (length bytes)  │
//! └──────────────┴──────────────────┴─────────────────────────┘
//! ```
//!
//! Strings are NUL-terminated ASCII. Integers and floats are little-endian.
//!
//! ## Exchanges
//!
//! | Request                 | Response                 |
//! |-------------------------|--------------------------|
//! | NAT_PING                | NAT_PINGRESPONSE         |
//! | NAT_REQUEST_MODELDEF    | NAT_MODELDEF             |
//! | NAT_REQUEST_FRAMEOFDATA | NAT_FRAMEOFDATA          |
//! | NAT_REQUEST             | NAT_RESPONSE or NAT_UNRECOGNIZED_REQUEST |
//!
//! Frames are also pushed unsolicited on the data port once streaming runs.

mod codec;
mod command;
pub mod constants;
mod frame;
mod model;
mod reader;
mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::{Codec, Response, ServerInfo};
pub use command::CommandPacket;
pub use frame::{FrameOutcome, Sentinels, apply_frame, is_stale};
pub use model::{ModelDefinition, decode_model_definition};
pub use reader::{PayloadReader, split_header};
pub use version::Version;
