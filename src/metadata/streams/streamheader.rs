//! Stream headers of the metadata root.
//!
//! Each header is `offset: u32`, `size: u32` and a null-terminated ASCII name padded to a
//! 4-byte boundary. Offsets are relative to the start of the metadata root.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::io::read_le, Error::OutOfBounds, Result};

/// Longest stream name ECMA-335 allows, including the terminator.
const MAX_NAME_LENGTH: usize = 32;

/// A single stream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, e.g. `#~` or `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Parses a stream header at the start of `data`.
    ///
    /// Names outside the standard set are accepted; the reader ignores streams it does not
    /// use.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short, and
    /// [`crate::Error::Malformed`] if the name is not terminated within 32 bytes or is not
    /// ASCII.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_area = &data[8..data.len().min(8 + MAX_NAME_LENGTH)];
        let Some(terminator) = name_area.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        let name = &name_area[..terminator];
        if name.is_empty() || !name.is_ascii() {
            return Err(malformed_error!("Invalid stream header name - {:?}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name: String::from_utf8_lossy(name).into_owned(),
        })
    }

    /// Number of bytes this header occupies, name padding included.
    #[must_use]
    pub fn header_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00,
        ];

        let parsed_header = StreamHeader::from(&header_bytes).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#~");
        assert_eq!(parsed_header.header_len(), 12);
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let unterminated = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E,
        ];
        assert!(StreamHeader::from(&unterminated).is_err());

        #[rustfmt::skip]
        let empty_name = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x00,
        ];
        assert!(StreamHeader::from(&empty_name).is_err());

        assert!(matches!(StreamHeader::from(&[0; 4]), Err(OutOfBounds)));
    }

    #[test]
    fn strings_header_length() {
        let mut header_bytes = vec![0_u8; 8];
        header_bytes.extend_from_slice(b"#Strings\0\0\0\0");
        let parsed_header = StreamHeader::from(&header_bytes).unwrap();
        assert_eq!(parsed_header.name, "#Strings");
        assert_eq!(parsed_header.header_len(), 20);
    }
}
