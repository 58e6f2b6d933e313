//! ECMA-335 metadata reading, limited to assembly manifests.
//!
//! A managed image is read from the CLR runtime header directory down to the metadata
//! tables: CLI header, metadata root, stream headers, heaps and table stream. Only the
//! `Assembly` row and the `AssemblyRef` rows are decoded; together they form an
//! [`AssemblyManifest`], the declared identity and what it references. No IL is read and
//! nothing is executed.
//!
//! # Key Components
//!
//! - [`AssemblyManifest`] - entry point: declared identity plus referenced identities
//! - [`cor20header::Cor20Header`] - the CLI header
//! - [`root::Root`] - the metadata root and its stream directory
//! - [`streams`] - `#Strings`, `#Blob` and the table stream header
//! - [`tables`] - table ids, row sizes and the assembly rows
//!
//! # Examples
//!
//! ```rust
//! use dotdeps::builder::ImageBuilder;
//! use dotdeps::identity::{AssemblyIdentity, AssemblyVersion};
//! use dotdeps::metadata::AssemblyManifest;
//!
//! let image = ImageBuilder::new("App")
//!     .reference(AssemblyIdentity::new("Lib", AssemblyVersion::new(2, 0, 0, 0)))
//!     .build();
//!
//! let manifest = AssemblyManifest::from_mem(image)?;
//! assert_eq!(manifest.identity.name, "App");
//! assert_eq!(manifest.references[0].name, "Lib");
//! # Ok::<(), dotdeps::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 6th Edition, Partition II](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

pub mod cor20header;
pub mod root;
pub mod streams;
pub mod tables;

pub use root::METADATA_SIGNATURE;
pub use tables::{TableId, ASSEMBLY_FLAG_PUBLIC_KEY};

use std::path::Path;

use crate::{
    file::File,
    identity::AssemblyIdentity,
    metadata::{
        cor20header::{Cor20Header, CLI_HEADER_SIZE},
        root::Root,
        streams::{Blob, Strings, TablesHeader},
        tables::{AssemblyRaw, AssemblyRefRaw},
    },
    Result,
};

/// The identity an assembly declares and the identities it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyManifest {
    /// Identity from the `Assembly` row.
    pub identity: AssemblyIdentity,
    /// Identities from the `AssemblyRef` rows, in table order.
    pub references: Vec<AssemblyIdentity>,
}

impl AssemblyManifest {
    /// Reads the manifest of the image at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped, is not a managed PE image, or its
    /// metadata is malformed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::from_file(path)?;
        Self::read(&file)
    }

    /// Reads the manifest of an image held in memory.
    ///
    /// # Errors
    /// Returns an error if `data` is not a managed PE image or its metadata is malformed.
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        let file = File::from_mem(data)?;
        Self::read(&file)
    }

    /// Reads the manifest of a loaded image.
    ///
    /// # Errors
    /// Returns an error if the CLI header or metadata cannot be located or parsed.
    pub fn read(file: &File) -> Result<Self> {
        let (clr_rva, _) = file.clr();
        let clr_offset = file.rva_to_offset(clr_rva)?;
        let header = Cor20Header::read(file.data_slice(clr_offset, CLI_HEADER_SIZE)?)?;

        let metadata_offset = file.rva_to_offset(header.meta_data_rva as usize)?;
        let metadata = file.data_slice(metadata_offset, header.meta_data_size as usize)?;

        Self::read_metadata(metadata)
    }

    /// Reads the manifest from raw metadata, starting at the `BSJB` signature.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a required stream or the `Assembly` row is
    /// missing, or any structure is out of bounds.
    pub fn read_metadata(metadata: &[u8]) -> Result<Self> {
        let root = Root::read(metadata)?;

        let stream_data = |name: &str| {
            root.stream(name).map(|header| {
                let start = header.offset as usize;
                &metadata[start..start + header.size as usize]
            })
        };

        let Some(tables) = stream_data("#~").or_else(|| stream_data("#-")) else {
            return Err(malformed_error!("Metadata has no table stream"));
        };
        let Some(strings) = stream_data("#Strings") else {
            return Err(malformed_error!("Metadata has no #Strings heap"));
        };

        let tables = TablesHeader::from(tables)?;
        let strings = Strings::from(strings)?;
        let blob = stream_data("#Blob").map(Blob::from).transpose()?;

        let Some(assembly) = tables.rows::<AssemblyRaw>()?.into_iter().next() else {
            return Err(malformed_error!(
                "Metadata has no Assembly row, the image is a module"
            ));
        };
        let identity = assembly.to_identity(&strings, blob.as_ref())?;

        let references = tables
            .rows::<AssemblyRefRaw>()?
            .iter()
            .map(|row| row.to_identity(&strings, blob.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(AssemblyManifest {
            identity,
            references,
        })
    }
}
