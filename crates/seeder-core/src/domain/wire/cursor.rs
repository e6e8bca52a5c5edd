//! Bounds-checked little-endian reading and writing of protocol primitives.

use crate::domain::WireError;

const TRUNCATED: WireError = WireError::Malformed("truncated payload");

/// Read cursor over an untrusted payload. Every read is bounds-checked.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Consume exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(TRUNCATED);
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Consume a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Ports are the one big-endian field in the protocol.
    pub fn read_u16_be(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Variable-length integer. Non-minimal encodings are rejected.
    pub fn read_compact_size(&mut self) -> Result<u64, WireError> {
        let non_canonical = WireError::Malformed("non-canonical compact size");
        match self.read_u8()? {
            0xFD => {
                let v = u64::from(self.read_u16_le()?);
                if v < 0xFD {
                    return Err(non_canonical);
                }
                Ok(v)
            }
            0xFE => {
                let v = u64::from(self.read_u32_le()?);
                if v <= 0xFFFF {
                    return Err(non_canonical);
                }
                Ok(v)
            }
            0xFF => {
                let v = self.read_u64_le()?;
                if v <= 0xFFFF_FFFF {
                    return Err(non_canonical);
                }
                Ok(v)
            }
            small => Ok(u64::from(small)),
        }
    }

    /// Length-prefixed string, capped at `max_len` bytes. Invalid UTF-8 is replaced.
    pub fn read_var_str(&mut self, max_len: usize) -> Result<String, WireError> {
        let len = self.read_compact_size()?;
        if len > max_len as u64 {
            return Err(WireError::Malformed("string too long"));
        }
        let bytes = self.read_bytes(len as usize)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Append a variable-length integer in its minimal encoding.
pub fn write_compact_size(buf: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xFC => buf.push(value as u8),
        0xFD..=0xFFFF => {
            buf.push(0xFD);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.push(0xFE);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xFF);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Append a length-prefixed string.
pub fn write_var_str(buf: &mut Vec<u8>, value: &str) {
    write_compact_size(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
}
