//! Payload builder for decoder tests.

use super::constants::HEADER_SIZE;

/// Little-endian payload writer mirroring the server's encoding
#[derive(Default)]
pub struct PayloadBuilder {
    data: Vec<u8>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f64(mut self, v: f64) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// NUL-terminated string
    pub fn string(mut self, s: &str) -> Self {
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self
    }

    /// String zero-padded to a fixed field
    pub fn fixed_string(mut self, s: &str, size: usize) -> Self {
        let start = self.data.len();
        self.data.extend_from_slice(s.as_bytes());
        self.data.resize(start + size, 0);
        self
    }

    pub fn bytes(mut self, b: &[u8]) -> Self {
        self.data.extend_from_slice(b);
        self
    }

    pub fn zeros(mut self, n: usize) -> Self {
        self.data.resize(self.data.len() + n, 0);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }

    /// Payload wrapped in a packet header
    pub fn packet(self, id: u16) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.data.len());
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}
