//! CLI header (`IMAGE_COR20_HEADER`) parsing.
//!
//! The CLI header is what the CLR runtime header data directory points at. Only the fields
//! needed to reach the metadata root are kept.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// Size of the CLI header in bytes.
pub const CLI_HEADER_SIZE: usize = 72;

/// Upper bound on the metadata size this reader accepts (256MB).
const MAX_METADATA_SIZE: u32 = 0x1000_0000;

/// The fields of the CLI header that locate the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header, always 72
    pub cb: u32,
    /// Major runtime version required
    pub major_runtime_version: u16,
    /// Minor runtime version required
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata in bytes
    pub meta_data_size: u32,
    /// `COMIMAGE_FLAGS_*`
    pub flags: u32,
}

impl Cor20Header {
    /// Parses the CLI header at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 72 bytes, and
    /// [`crate::Error::Malformed`] for a wrong `cb` or an empty or oversized metadata range.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < CLI_HEADER_SIZE {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb as usize != CLI_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        if meta_data_rva == 0 {
            return Err(malformed_error!("Metadata RVA cannot be zero"));
        }

        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_size == 0 {
            return Err(malformed_error!("Metadata size cannot be zero"));
        } else if meta_data_size > MAX_METADATA_SIZE {
            return Err(malformed_error!(
                "Metadata size {} exceeds reasonable limit (256MB)",
                meta_data_size
            ));
        }

        let flags = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cb: u32, rva: u32, size: u32) -> Vec<u8> {
        let mut data = vec![0_u8; CLI_HEADER_SIZE];
        data[0..4].copy_from_slice(&cb.to_le_bytes());
        data[4..6].copy_from_slice(&2_u16.to_le_bytes());
        data[6..8].copy_from_slice(&5_u16.to_le_bytes());
        data[8..12].copy_from_slice(&rva.to_le_bytes());
        data[12..16].copy_from_slice(&size.to_le_bytes());
        data[16..20].copy_from_slice(&0x0002_0003_u32.to_le_bytes());
        data
    }

    #[test]
    fn crafted() {
        let parsed = Cor20Header::read(&header(72, 0x2048, 0x1A0)).unwrap();
        assert_eq!(parsed.major_runtime_version, 2);
        assert_eq!(parsed.minor_runtime_version, 5);
        assert_eq!(parsed.meta_data_rva, 0x2048);
        assert_eq!(parsed.meta_data_size, 0x1A0);
        assert_eq!(parsed.flags, 0x0002_0003);
    }

    #[test]
    fn invalid() {
        assert!(matches!(
            Cor20Header::read(&header(72, 1, 1)[..40]),
            Err(OutOfBounds)
        ));
        assert!(Cor20Header::read(&header(64, 0x2048, 0x1A0)).is_err());
        assert!(Cor20Header::read(&header(72, 0, 0x1A0)).is_err());
        assert!(Cor20Header::read(&header(72, 0x2048, 0)).is_err());
        assert!(Cor20Header::read(&header(72, 0x2048, 0x2000_0000)).is_err());
    }
}
