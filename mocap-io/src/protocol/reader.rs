//! Bounds-checked cursor over a received datagram.
//!
//! Every read advances the cursor and fails with [`Error::Truncated`] instead
//! of panicking when the payload is shorter than the layout requires.

use super::constants::{HEADER_SIZE, MARKER_POSITION_SIZE};
use crate::error::{Error, Result};
use crate::scene::{Quaternion, Vector3};

/// Split a datagram into packet id and payload
///
/// The declared payload length must match the bytes received exactly;
/// anything else is a malformed packet and is dropped by the caller.
pub fn split_header(datagram: &[u8]) -> Result<(u16, &[u8])> {
    if datagram.len() < HEADER_SIZE {
        return Err(Error::Truncated {
            needed: HEADER_SIZE,
            remaining: datagram.len(),
        });
    }

    let id = u16::from_le_bytes([datagram[0], datagram[1]]);
    let declared = u16::from_le_bytes([datagram[2], datagram[3]]) as usize;
    let payload = &datagram[HEADER_SIZE..];

    if declared != payload.len() {
        return Err(Error::MalformedPacket {
            id,
            declared,
            received: payload.len(),
        });
    }
    Ok((id, payload))
}

/// Little-endian payload cursor
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.take_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.take_array().map(i32::from_le_bytes)
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        self.take_array().map(f64::from_le_bytes)
    }

    pub fn read_version(&mut self) -> Result<[u8; 4]> {
        self.take_array()
    }

    pub fn read_vector3(&mut self) -> Result<Vector3> {
        Ok(Vector3::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    pub fn read_quaternion(&mut self) -> Result<Quaternion> {
        Ok(Quaternion::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Element count; negative values are rejected
    pub fn read_count(&mut self) -> Result<usize> {
        let n = self.read_i32()?;
        usize::try_from(n).map_err(|_| Error::InvalidPacket(format!("negative count {}", n)))
    }

    /// Element count whose elements occupy at least `min_size` bytes each
    ///
    /// Rejects counts the remaining payload cannot possibly hold, so a
    /// corrupt count never drives a huge allocation.
    pub fn read_count_of(&mut self, min_size: usize) -> Result<usize> {
        let n = self.read_count()?;
        let needed = n.saturating_mul(min_size);
        if needed > self.remaining() {
            return Err(Error::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(n)
    }

    /// NUL-terminated ASCII string
    ///
    /// A missing terminator consumes the rest of the payload.
    pub fn read_string(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let (bytes, consumed) = match rest.iter().position(|&b| b == 0) {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// String stored in a fixed-size, zero-padded field
    pub fn read_fixed_string(&mut self, field_size: usize) -> Result<String> {
        let field = self.take(field_size)?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        Ok(String::from_utf8_lossy(&field[..end]).into_owned())
    }

    /// Skip `count` marker positions
    #[inline]
    pub fn skip_markers(&mut self, count: usize) -> Result<()> {
        self.skip(count.saturating_mul(MARKER_POSITION_SIZE))
    }
}
