//! mocap-io - Client library for NatNet motion capture streaming
//!
//! Connects to a NatNet server (e.g. OptiTrack Motive), mirrors its scene of
//! actors, bones, markers and force plates, and keeps it current from the
//! server's frame stream.
//!
//! ## Modules
//!
//! - `scene`: the entity graph the decoder writes into
//! - `protocol`: packet framing, command encoding, model and frame decoding
//! - `client`: connection management, stream receiver, listeners
//! - `config`: TOML configuration

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod scene;

// Re-export commonly used types
pub use client::{NatNetClient, SceneEvent, SceneListener};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use scene::{Actor, Bone, Channel, Device, Marker, Scene};
