//! ECMA-335 metadata tables.
//!
//! The table stream is read only as far as identity resolution needs it: every table's
//! row size is computed so the `Assembly` and `AssemblyRef` rows can be located, and only
//! those two row kinds are decoded.
//!
//! # Key Components
//!
//! - [`TableId`] - table identifiers, valued by their bit in the `valid` mask
//! - [`CodedIndexType`] - coded index kinds and the tables they reference
//! - [`TableInfo`] - row counts, heap index widths and row sizes
//! - [`AssemblyRaw`] / [`AssemblyRefRaw`] - the decoded rows
//!
//! # Reference
//! - [ECMA-335 II.22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

mod assembly;
mod codedindex;
mod tableid;
mod tableinfo;

pub use assembly::{AssemblyRaw, AssemblyRefRaw, ASSEMBLY_FLAG_PUBLIC_KEY};
pub use codedindex::CodedIndexType;
pub use tableid::TableId;
pub use tableinfo::{
    TableInfo, HEAP_EXTRA_DATA, HEAP_LARGE_BLOB, HEAP_LARGE_GUID, HEAP_LARGE_STRINGS,
};

use crate::Result;

/// A table row that can be decoded from the table stream.
pub trait RowReadable: Sized {
    /// The table holding rows of this kind.
    const TABLE: TableId;

    /// Decodes one row at `offset`, advancing it by the row size.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row leaves `data`.
    fn row_read(data: &[u8], offset: &mut usize, sizes: &TableInfo) -> Result<Self>;
}
