//! Cursor-based byte reader used by the instruction decoder.
//!
//! [`Parser`] wraps a method body and keeps a position into it. All reads are bounds-checked
//! through [`crate::file::io::read_le_at`], so a truncated operand surfaces as
//! [`crate::Error::OutOfBounds`] instead of a panic.
//!
//! # Examples
//!
//! ```rust
//! use cilguard::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
//! let mut parser = Parser::new(&data);
//!
//! let first = parser.read_le::<u32>()?;
//! assert_eq!(first, 0x04030201);
//!
//! parser.seek(6)?;
//! assert_eq!(parser.read_le::<u16>()?, 0x0807);
//! assert!(!parser.has_more_data());
//! # Ok::<(), cilguard::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Error::OutOfBounds,
    Result,
};

/// A little-endian binary cursor over a borrowed byte slice.
///
/// Holds no resources beyond the borrow, so it can be dropped at any point of a scan.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left between the cursor and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.position).copied().ok_or(OutOfBounds)
    }

    /// Read a value of type `T` in little-endian order and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `length` raw bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(length)?;
        Ok(&self.data[start..self.position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_sequential_reads() {
        let data = [0x2A, 0x01, 0x00, 0x00, 0x0A];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_le::<u8>().unwrap(), 0x2A);
        assert_eq!(parser.read_le::<u32>().unwrap(), 0x0A00_0001);
        assert!(!parser.has_more_data());
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn test_error_handling() {
        let data = [0x01, 0x02];
        let mut parser = Parser::new(&data);

        assert!(matches!(parser.read_le::<u32>(), Err(Error::OutOfBounds)));
        assert_eq!(parser.pos(), 0);
        assert!(matches!(parser.seek(2), Err(Error::OutOfBounds)));
        assert!(matches!(parser.advance_by(3), Err(Error::OutOfBounds)));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0xFE, 0x01];
        let parser = Parser::new(&data);

        assert_eq!(parser.peek_byte().unwrap(), 0xFE);
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn test_read_bytes() {
        let data = [0x01, 0x02, 0x03];
        let mut parser = Parser::new(&data);

        parser.advance_by(1).unwrap();
        assert_eq!(parser.read_bytes(2).unwrap(), &[0x02, 0x03]);
        assert!(parser.read_bytes(1).is_err());
    }

    #[test]
    fn test_empty() {
        let parser = Parser::new(&[]);
        assert!(parser.is_empty());
        assert!(!parser.has_more_data());
        assert!(parser.peek_byte().is_err());
    }
}
