//! PE file access for managed binaries.
//!
//! [`File`] pairs a data source with the [`goblin`] PE view parsed over it, and exposes
//! what the metadata reader needs: the CLR runtime header directory, RVA to file offset
//! translation and bounds-checked slices. The data source is a [`Backend`], either a
//! memory mapping of a file on disk or an owned buffer.
//!
//! # Examples
//!
//! ```rust,ignore
//! use dotdeps::file::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("App.dll"))?;
//! let (clr_rva, clr_size) = file.clr();
//! let clr_offset = file.rva_to_offset(clr_rva)?;
//! let cli_header = file.data_slice(clr_offset, clr_size)?;
//! # Ok::<(), dotdeps::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use goblin::pe::PE;
use ouroboros::self_referencing;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use memory::Memory;
use physical::Physical;

/// A source of raw image bytes.
pub trait Backend: Send + Sync {
    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns all bytes.
    fn data(&self) -> &[u8];

    /// Returns the number of bytes.
    fn len(&self) -> usize;
}

/// A parsed PE image that carries a CLR runtime header.
#[self_referencing]
pub struct File {
    data: Box<dyn Backend>,
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Memory-maps and parses the file at `file`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a PE image, or has no CLR
    /// runtime header directory.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Parses an image held in memory.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty, not a PE image, or has no CLR runtime
    /// header directory.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| match PE::parse(data.data()) {
            Ok(pe) => match pe.header.optional_header {
                Some(optional_header) => {
                    match optional_header.data_directories.get_clr_runtime_header() {
                        Some(clr) if clr.size > 0 => Ok(pe),
                        _ => Err(malformed_error!(
                            "File does not have a CLR runtime header directory"
                        )),
                    }
                }
                None => Err(malformed_error!("File does not have an OptionalHeader")),
            },
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Total size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the image has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.borrow_data().data()
    }

    /// Returns `len` bytes starting at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.borrow_data().data_slice(offset, len)
    }

    /// RVA and size of the CLR runtime header.
    #[must_use]
    pub fn clr(&self) -> (usize, usize) {
        self.with_pe(|pe| {
            pe.header
                .optional_header
                .as_ref()
                .and_then(|optional_header| {
                    optional_header
                        .data_directories
                        .get_clr_runtime_header()
                        .as_ref()
                        .map(|clr| (clr.virtual_address as usize, clr.size as usize))
                })
                .unwrap_or((0, 0))
        })
    }

    /// Translates a relative virtual address into a file offset by walking the
    /// section table.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section covers `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let extent = section.virtual_size.max(section.size_of_raw_data);
                let Some(section_max) = section.virtual_address.checked_add(extent) else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        extent
                    ));
                };

                if section.virtual_address <= rva_u32 && rva_u32 < section_max {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;

    #[test]
    fn load_built_image() {
        let image = ImageBuilder::new("Sample").build();
        let file = File::from_mem(image).unwrap();

        let (clr_rva, clr_size) = file.clr();
        assert_eq!(clr_size, 72);

        let offset = file.rva_to_offset(clr_rva).unwrap();
        let header = file.data_slice(offset, 4).unwrap();
        assert_eq!(header, &72_u32.to_le_bytes());
    }

    #[test]
    fn empty_is_rejected() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
    }

    #[test]
    fn native_image_is_rejected() {
        let image = ImageBuilder::new("Native").native().build();
        assert!(File::from_mem(image).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(File::from_mem(vec![0xAB; 512]).is_err());
    }

    #[test]
    fn unmapped_rva_fails() {
        let image = ImageBuilder::new("Sample").build();
        let file = File::from_mem(image).unwrap();
        assert!(file.rva_to_offset(0x10).is_err());
    }
}
