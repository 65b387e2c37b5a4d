//! Wire primitives shared by the property codec and the packet framer.
//!
//! MQTT v5 builds every packet from a handful of data types: big-endian
//! integers, variable byte integers, two-byte length-prefixed UTF-8 strings
//! and binary data. [`Writer`] and [`Reader`] are bounded cursors over byte
//! slices that encode and decode those types and report failures with the
//! byte offset where they happened.

use super::error::Error;
use heapless::{String, Vec};

/// Largest value a variable byte integer can hold.
pub const VARIABLE_INT_MAX: u32 = 268_435_455;

/// Number of bytes `value` takes as a variable byte integer.
pub fn variable_int_len(value: u32) -> usize {
    match value {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}

/// Decode a variable byte integer starting at `buf[start]`.
///
/// Returns `Ok(None)` when the buffer ends before the integer does, and
/// `Ok(Some((value, len)))` otherwise. A fourth byte with the continuation
/// bit set is malformed; the reported offset is that byte's index in `buf`.
pub fn decode_variable_int(buf: &[u8], start: usize) -> Result<Option<(u32, usize)>, Error> {
    let mut value: u32 = 0;
    let mut multiplier: u32 = 1;
    for i in 0..4 {
        let Some(&byte) = buf.get(start + i) else {
            return Ok(None);
        };
        value += (byte & 0x7F) as u32 * multiplier;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        multiplier *= 128;
    }
    Err(Error::Malformed { offset: start + 3 })
}

/// Write cursor over a caller-provided buffer.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    /// Start writing at the beginning of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Append raw bytes.
    pub fn put_slice(&mut self, data: &[u8]) -> Result<(), Error> {
        let end = self.pos + data.len();
        if end > self.buf.len() {
            return Err(Error::BufferOverflow);
        }
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    /// Append one byte.
    pub fn put_u8(&mut self, value: u8) -> Result<(), Error> {
        self.put_slice(&[value])
    }

    /// Append a big-endian two-byte integer.
    pub fn put_u16(&mut self, value: u16) -> Result<(), Error> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Append a big-endian four-byte integer.
    pub fn put_u32(&mut self, value: u32) -> Result<(), Error> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Append a variable byte integer.
    pub fn put_variable_int(&mut self, mut value: u32) -> Result<(), Error> {
        if value > VARIABLE_INT_MAX {
            return Err(Error::BufferOverflow);
        }
        loop {
            let mut byte = (value % 128) as u8;
            value /= 128;
            if value > 0 {
                byte |= 0x80;
            }
            self.put_u8(byte)?;
            if value == 0 {
                return Ok(());
            }
        }
    }

    /// Append two-byte length-prefixed binary data.
    pub fn put_binary(&mut self, data: &[u8]) -> Result<(), Error> {
        let len = u16::try_from(data.len()).map_err(|_| Error::BufferOverflow)?;
        self.put_u16(len)?;
        self.put_slice(data)
    }

    /// Append a two-byte length-prefixed UTF-8 string.
    pub fn put_str(&mut self, s: &str) -> Result<(), Error> {
        self.put_binary(s.as_bytes())
    }
}

/// Read cursor over a received frame.
///
/// `base` is the offset of `buf[0]` within the frame, so errors from nested
/// readers still point into the original buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    /// Read `buf`, reporting offsets starting at `base`.
    pub fn new(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Offset of the next byte, relative to the frame.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes left.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// `true` once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn malformed(&self) -> Error {
        Error::Malformed {
            offset: self.offset(),
        }
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if n > self.remaining() {
            return Err(self.malformed());
        }
        let data = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(data)
    }

    /// Take everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let data = &self.buf[self.pos..];
        self.pos = self.buf.len();
        data
    }

    /// Split off the next `n` bytes as their own reader.
    pub fn sub(&mut self, n: usize) -> Result<Reader<'a>, Error> {
        let base = self.offset();
        let data = self.take(n)?;
        Ok(Reader::new(data, base))
    }

    /// Read one byte.
    pub fn get_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian two-byte integer.
    pub fn get_u16(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian four-byte integer.
    pub fn get_u32(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a variable byte integer.
    pub fn get_variable_int(&mut self) -> Result<u32, Error> {
        match decode_variable_int(self.buf, self.pos) {
            Ok(Some((value, len))) => {
                self.pos += len;
                Ok(value)
            }
            Ok(None) => Err(Error::Malformed {
                offset: self.base + self.buf.len(),
            }),
            Err(Error::Malformed { offset }) => Err(Error::Malformed {
                offset: self.base + offset,
            }),
            Err(e) => Err(e),
        }
    }

    /// Read a byte that must be 0 or 1.
    pub fn get_bool(&mut self) -> Result<bool, Error> {
        let offset = self.offset();
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::Malformed { offset }),
        }
    }

    /// Read two-byte length-prefixed binary data without copying.
    pub fn get_binary_ref(&mut self) -> Result<&'a [u8], Error> {
        let len = self.get_u16()? as usize;
        self.take(len)
    }

    /// Read a two-byte length-prefixed UTF-8 string without copying.
    ///
    /// Invalid UTF-8 and the null character are malformed.
    pub fn get_str_ref(&mut self) -> Result<&'a str, Error> {
        let offset = self.offset();
        let bytes = self.get_binary_ref()?;
        let s = core::str::from_utf8(bytes).map_err(|_| Error::Malformed { offset })?;
        if s.contains('\0') {
            return Err(Error::Malformed { offset });
        }
        Ok(s)
    }

    /// Read a string into a fixed-capacity buffer.
    pub fn get_str<const N: usize>(&mut self) -> Result<String<N>, Error> {
        let s = self.get_str_ref()?;
        String::try_from(s).map_err(|_| Error::BufferOverflow)
    }

    /// Read binary data into a fixed-capacity buffer.
    pub fn get_binary<const N: usize>(&mut self) -> Result<Vec<u8, N>, Error> {
        let data = self.get_binary_ref()?;
        Vec::from_slice(data).map_err(|_| Error::BufferOverflow)
    }
}
