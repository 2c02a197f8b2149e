//! Byte-level reader and writer
//!
//! All fixed-width integers are little-endian. Two variable-length encodings
//! are supported:
//!
//! - ULEB128 over a 32-bit value space
//! - ULEB128-with-mark ("ULEB128_33"): the low bit of the first byte carries a
//!   boolean, leaving 6 value bits in that byte before the usual 7-bit groups

use crate::error::{DecodeError, Result};
use crate::numeric::sign_extend;

/// Reads from a borrowed byte buffer
///
/// `base` is the absolute offset of `buf[0]` within the whole container, so
/// errors raised by a reader over a prototype body still point at the right
/// place in the file.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte to be read
    #[inline]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes consumed so far
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check whether every byte has been consumed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Split off the next `len` bytes as a reader of their own
    pub fn sub_reader(&mut self, len: usize) -> Result<ByteReader<'a>> {
        let base = self.offset();
        let buf = self.read_bytes(len)?;
        Ok(ByteReader { buf, pos: 0, base })
    }

    /// Read exactly `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::TruncatedInput {
                offset: self.offset(),
                needed: len - self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read one byte
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian 16-bit word
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian 32-bit word
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read one byte, sign-extended
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(sign_extend(self.read_u8()?.into(), 1) as i8)
    }

    /// Read a 16-bit word, sign-extended
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(sign_extend(self.read_u16()?.into(), 2) as i16)
    }

    /// Read a 32-bit word, sign-extended
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(sign_extend(self.read_u32()?.into(), 4) as i32)
    }

    /// Read a ULEB128 value
    ///
    /// Groups past the 32-bit value space are consumed but contribute nothing.
    pub fn read_uleb128(&mut self) -> Result<u32> {
        let first = self.read_u8()?;
        if first < 0x80 {
            return Ok(first.into());
        }
        self.read_uleb128_tail(u32::from(first & 0x7f), 7)
    }

    /// Read a ULEB128-with-mark value, returning the magnitude and the mark
    pub fn read_uleb128_33(&mut self) -> Result<(u32, bool)> {
        let first = self.read_u8()?;
        let mark = first & 1 != 0;
        let value = u32::from(first >> 1);
        if value < 0x40 {
            return Ok((value, mark));
        }
        let value = self.read_uleb128_tail(value & 0x3f, 6)?;
        Ok((value, mark))
    }

    fn read_uleb128_tail(&mut self, mut value: u32, mut shift: u32) -> Result<u32> {
        loop {
            let byte = self.read_u8()?;
            if shift < 32 {
                value |= u32::from(byte & 0x7f) << shift;
            }
            shift += 7;
            if byte < 0x80 {
                return Ok(value);
            }
        }
    }
}

/// Appends to a growable byte buffer
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check whether nothing has been written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View the written bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the written bytes
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Append raw bytes
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append one byte
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append a little-endian 16-bit word
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Append a little-endian 32-bit word
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Append a ULEB128 value
    pub fn write_uleb128(&mut self, mut value: u32) {
        while value >= 0x80 {
            self.write_u8((value & 0x7f) as u8 | 0x80);
            value >>= 7;
        }
        self.write_u8(value as u8);
    }

    /// Append a ULEB128-with-mark value
    pub fn write_uleb128_33(&mut self, value: u32, mark: bool) {
        let mark = u8::from(mark);
        if value >= 0x40 {
            self.write_u8((((value & 0x3f) as u8) << 1) | 0x80 | mark);
            self.write_uleb128(value >> 6);
        } else {
            self.write_u8(((value as u8) << 1) | mark);
        }
    }
}
