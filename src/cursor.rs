//! Read position over an immutable byte buffer, plus the scalar decoders that
//! interpret the bytes under it.
//!
//! The cursor does not fetch anything on its own. [`Cursor::read`] moves the
//! window forward: the previous window's size is added to the offset and the
//! new size is recorded. The scalar decoders ([`Cursor::integer_value`],
//! [`Cursor::string_value`], [`Cursor::bit_value`], ...) then look at the
//! bytes inside the current window without moving it.
//!
//! ```text
//!   offset        offset + last_size
//!     |<-- last_size -->|
//! ... [ current window  ] next read starts here ...
//! ```
//!
//! Every range is checked against the buffer length; an out-of-range window
//! yields [`Error::OutOfBounds`]. Cursors are `Copy`, so deferred decoders
//! create their own at a saved offset and never disturb anyone else's state.

use crate::{Error, Result};

/// A saved cursor position, see [`Cursor::save`] / [`Cursor::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    offset: usize,
    last_size: usize,
}

/// Monotonically advancing read window over a byte slice.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
    last_size: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at the start of `data` with an empty window.
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Cursor whose next read starts at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            offset,
            last_size: 0,
        }
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Start of the current window.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the current window.
    pub fn last_size(&self) -> usize {
        self.last_size
    }

    /// First byte after the current window, i.e. where the next read starts.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.last_size)
    }

    /// Bytes left in the buffer after the current window. Zero when the
    /// window already runs past the end.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.end())
    }

    /// Advance past the current window and open a new one of `size` bytes.
    ///
    /// The window moves even when it does not fit, so that on
    /// [`Error::OutOfBounds`] [`Cursor::offset`] names the failing field.
    pub fn read(&mut self, size: usize) -> Result<()> {
        self.offset = self.end();
        self.last_size = size;
        self.check()
    }

    /// Verify that the current window lies within the buffer.
    pub fn check(&self) -> Result<()> {
        match self.offset.checked_add(self.last_size) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(self.out_of_bounds()),
        }
    }

    /// Snapshot of the current position.
    pub fn save(&self) -> Checkpoint {
        Checkpoint {
            offset: self.offset,
            last_size: self.last_size,
        }
    }

    /// Return to a position taken with [`Cursor::save`].
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.offset = checkpoint.offset;
        self.last_size = checkpoint.last_size;
    }

    /// Number of bytes between `start` and the end of the current window.
    pub fn consumed_since(&self, start: usize) -> usize {
        self.end().saturating_sub(start)
    }

    /// The bytes of the current window.
    pub fn bytes(&self) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(self.last_size)
            .ok_or_else(|| self.out_of_bounds())?;
        self.data
            .get(self.offset..end)
            .ok_or_else(|| self.out_of_bounds())
    }

    /// Little-endian unsigned integer over the current window.
    ///
    /// Windows wider than 8 bytes keep only their low 8 bytes.
    pub fn integer_value(&self) -> Result<u64> {
        Ok(self
            .bytes()?
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// The current window as a one-byte value.
    pub fn u8_value(&self) -> Result<u8> {
        Ok(self.integer_value()? as u8)
    }

    /// The current window as a little-endian `u16`.
    pub fn u16_value(&self) -> Result<u16> {
        Ok(self.integer_value()? as u16)
    }

    /// The current window as a little-endian `u32`.
    pub fn u32_value(&self) -> Result<u32> {
        Ok(self.integer_value()? as u32)
    }

    /// The current window as single-byte characters (Latin-1).
    pub fn string_value(&self) -> Result<String> {
        Ok(self.bytes()?.iter().map(|&b| char::from(b)).collect())
    }

    /// Bit `bit` (0 = LSB) of [`Cursor::integer_value`].
    pub fn bit_value(&self, bit: u32) -> Result<bool> {
        let value = self.integer_value()?;
        Ok(bit < 64 && (value >> bit) & 1 == 1)
    }

    /// Read the next `size` bytes and return them.
    pub fn take(&mut self, size: usize) -> Result<&'a [u8]> {
        self.read(size)?;
        self.bytes()
    }

    fn out_of_bounds(&self) -> Error {
        Error::OutOfBounds {
            offset: self.offset,
            size: self.last_size,
            len: self.data.len(),
        }
    }
}
