//! Sequential cursor over a byte slice.
//!
//! [`Parser`] reads the fixed-layout CLI header and the compressed length prefixes of
//! `#Blob` entries. Stream headers and table rows are read at explicit offsets through
//! [`crate::file::io`] instead. Every read is bounds-checked and returns
//! [`crate::Error::OutOfBounds`] rather than panicking on truncated input.

use crate::{
    file::io::{read_le_at, CilIO},
    Result,
};

/// A position-tracking reader over borrowed bytes.
///
/// # Examples
///
/// ```rust,ignore
/// use dotdeps::file::parser::Parser;
///
/// let data = [0x05, b'h', b'e', b'l', b'l', b'o'];
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_compressed_uint()?, 5);
/// assert_eq!(parser.pos(), 1);
/// # Ok::<(), dotdeps::Error>(())
/// ```
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Current read position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Reads a little-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Reads an ECMA-335 compressed unsigned integer (II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input or
    /// [`crate::Error::Malformed`] for an invalid leading byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        // 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }
}
