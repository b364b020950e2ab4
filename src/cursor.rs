use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::errors::{CgrpError, CgrpResult};
use crate::utils::fourcc_to_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Bounds-checked read head; structural fields are little-endian, tags big-endian
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    position: usize,
}

impl ByteCursor {
    pub fn new(data: Bytes) -> Self {
        Self { data, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Move to an absolute offset; the end of the buffer is a valid position
    pub fn seek(&mut self, offset: usize) -> CgrpResult<()> {
        if offset > self.data.len() {
            return Err(CgrpError::InvalidOffset {
                field: "seek target".to_string(),
                offset: offset as u64,
                start: 0,
                end: self.data.len(),
            });
        }
        self.position = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> CgrpResult<()> {
        self.take(count).map(|_| ())
    }

    pub fn rewind(&mut self, count: usize) -> CgrpResult<()> {
        let target = self
            .position
            .checked_sub(count)
            .ok_or(CgrpError::IntegerOverflow {
                operation: "cursor rewind".to_string(),
                details: format!("position 0x{:X} - {}", self.position, count),
            })?;
        self.seek(target)
    }

    fn take(&mut self, count: usize) -> CgrpResult<&[u8]> {
        if count > self.remaining() {
            return Err(CgrpError::BufferUnderflow {
                offset: self.position,
                needed: count,
                available: self.remaining(),
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }

    /// Decode an unsigned integer of 1 to 8 bytes
    pub fn read_uint(&mut self, width: usize, endian: Endian) -> CgrpResult<u64> {
        if !(1..=8).contains(&width) {
            return Err(CgrpError::InvalidReadWidth {
                width,
                offset: self.position,
            });
        }
        let bytes = self.take(width)?;
        Ok(match endian {
            Endian::Little => LittleEndian::read_uint(bytes, width),
            Endian::Big => BigEndian::read_uint(bytes, width),
        })
    }

    pub fn read_u16_le(&mut self) -> CgrpResult<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub fn read_u32_le(&mut self) -> CgrpResult<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    pub fn read_u32_be(&mut self) -> CgrpResult<u32> {
        self.take(4).map(BigEndian::read_u32)
    }

    /// Decode a field and fail with the field's start offset when it differs from `expected`
    pub fn expect_uint(
        &mut self,
        field: &str,
        width: usize,
        endian: Endian,
        expected: u64,
    ) -> CgrpResult<()> {
        let offset = self.position;
        let actual = self.read_uint(width, endian)?;
        if actual != expected {
            let digits = width * 2;
            return Err(CgrpError::UnexpectedValue {
                field: field.to_string(),
                expected: format!("0x{:0digits$X}", expected),
                actual: format!("0x{:0digits$X}", actual),
                offset,
            });
        }
        Ok(())
    }

    /// Read a 4-byte magic and compare it as written in the file
    pub fn expect_magic(&mut self, magic: [u8; 4]) -> CgrpResult<()> {
        let offset = self.position;
        let found = self.read_u32_be()?;
        if found.to_be_bytes() != magic {
            return Err(CgrpError::InvalidMagicBytes {
                expected: String::from_utf8_lossy(&magic).to_string(),
                found: fourcc_to_string(found),
                offset,
            });
        }
        Ok(())
    }

    /// Zero-copy view of `[offset, offset + length)`
    pub fn slice(&self, offset: usize, length: usize) -> CgrpResult<Bytes> {
        let end = offset
            .checked_add(length)
            .ok_or(CgrpError::IntegerOverflow {
                operation: "slice range".to_string(),
                details: format!("offset 0x{:X} + length {}", offset, length),
            })?;
        if end > self.data.len() {
            return Err(CgrpError::BufferUnderflow {
                offset,
                needed: length,
                available: self.data.len().saturating_sub(offset),
            });
        }
        Ok(self.data.slice(offset..end))
    }
}
