//! The metadata root (`BSJB` header) and its stream directory.
//!
//! Layout: signature, major/minor version, reserved, a length-prefixed version string
//! padded to 4 bytes, flags, stream count and then the stream headers.
//!
//! # Reference
//! - [ECMA-335 II.24.2.1](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Error::OutOfBounds,
    Result,
};

/// Magic signature of the metadata root, `BSJB` in little-endian.
pub const METADATA_SIGNATURE: u32 = 0x424A_5342;

/// Longest version string ECMA-335 allows.
const MAX_VERSION_LENGTH: u32 = 255;

/// The metadata root header.
#[derive(Debug, Clone)]
pub struct Root {
    /// Always [`METADATA_SIGNATURE`]
    pub signature: u32,
    /// Major version, usually 1
    pub major_version: u16,
    /// Minor version, usually 1
    pub minor_version: u16,
    /// Runtime version string, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// Stream headers in file order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parses the metadata root at the start of `data`, which must span the whole
    /// metadata so stream ranges can be checked.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] if the header
    /// or any stream range does not fit into `data`.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != METADATA_SIGNATURE {
            return Err(malformed_error!(
                "Metadata signature does not match - 0x{:08X}",
                signature
            ));
        }

        let version_length = read_le_at::<u32>(data, &mut 12)?;
        if version_length > MAX_VERSION_LENGTH {
            return Err(malformed_error!(
                "Version string too long - {}",
                version_length
            ));
        }

        let version_length = version_length as usize;
        let Some(version_bytes) = data.get(16..16 + version_length) else {
            return Err(OutOfBounds);
        };
        let version_end = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_length);
        let version = String::from_utf8_lossy(&version_bytes[..version_end]).into_owned();

        let mut offset = 16 + version_length;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 {
            return Err(malformed_error!("No streams have been found"));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            let Some(remaining) = data.get(offset..) else {
                return Err(OutOfBounds);
            };

            let header = StreamHeader::from(remaining)?;
            match header.offset.checked_add(header.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        header.offset,
                        header.size
                    ))
                }
            }

            offset += header.header_len();
            stream_headers.push(header);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            version,
            flags,
            stream_headers,
        })
    }

    /// Returns the first stream header called `name`.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}
