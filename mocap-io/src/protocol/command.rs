//! Outgoing command packets
//!
//! `CommandPacket` is a single reusable buffer for every request the client
//! sends. Each `set_*` call rewrites the buffer and patches the payload
//! length into the header.
//!
//! ```ignore
//! let mut pkt = CommandPacket::new();
//! pkt.set_ping("Rust MoCap Client", [1, 0, 1, 0]);
//! socket.send(pkt.as_bytes())?;
//! pkt.set_request("getDataStreamAddress")?;
//! socket.send(pkt.as_bytes())?;
//! ```

use super::constants::*;
use crate::error::{Error, Result};

/// Reusable TX buffer for all client commands
pub struct CommandPacket {
    data: Vec<u8>,
}

impl CommandPacket {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(HEADER_SIZE + MAX_NAMELENGTH + 8),
        }
    }

    /// Packet bytes for sending
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Packet id of the current command, if one has been set
    #[inline]
    pub fn id(&self) -> Option<u16> {
        match self.data.as_slice() {
            [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }

    fn begin(&mut self, id: u16) {
        self.data.clear();
        self.data.extend_from_slice(&id.to_le_bytes());
        self.data.extend_from_slice(&[0, 0]); // length, patched in finalize()
    }

    fn finalize(&mut self) {
        let len = (self.data.len() - HEADER_SIZE) as u16;
        self.data[2..4].copy_from_slice(&len.to_le_bytes());
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Handshake (NAT_PING)
    ///
    /// Name in a zero-padded 256-byte field, then the application version and
    /// the protocol version this client speaks.
    pub fn set_ping(&mut self, client_name: &str, app_version: [u8; 4]) {
        self.begin(NAT_PING);
        let name = client_name.as_bytes();
        let name = &name[..name.len().min(MAX_CLIENT_NAME)];
        self.data.extend_from_slice(name);
        self.data.resize(HEADER_SIZE + MAX_NAMELENGTH, 0);
        self.data.extend_from_slice(&app_version);
        self.data.extend_from_slice(&CLIENT_NATNET_VERSION);
        self.finalize();
    }

    /// Scene description request (NAT_REQUEST_MODELDEF)
    pub fn set_request_model_definition(&mut self) {
        self.begin(NAT_REQUEST_MODELDEF);
        self.finalize();
    }

    /// Single frame request (NAT_REQUEST_FRAMEOFDATA)
    pub fn set_request_frame(&mut self) {
        self.begin(NAT_REQUEST_FRAMEOFDATA);
        self.finalize();
    }

    /// Free-form command (NAT_REQUEST), NUL-terminated
    ///
    /// Fails if the packet would exceed `MAX_PACKET_SIZE`; the buffer is left
    /// untouched in that case.
    pub fn set_request(&mut self, command: &str) -> Result<()> {
        let size = HEADER_SIZE + command.len() + 1;
        if size > MAX_PACKET_SIZE {
            return Err(Error::InvalidPacket(format!(
                "command of {} bytes exceeds {} byte packet limit",
                command.len(),
                MAX_PACKET_SIZE
            )));
        }
        self.begin(NAT_REQUEST);
        self.data.extend_from_slice(command.as_bytes());
        self.data.push(0);
        self.finalize();
        Ok(())
    }
}

impl Default for CommandPacket {
    fn default() -> Self {
        Self::new()
    }
}
