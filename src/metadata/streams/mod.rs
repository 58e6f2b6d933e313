//! Metadata streams.
//!
//! The metadata root lists a handful of streams. Identity resolution needs three of them:
//!
//! - **`#~`** (or the uncompressed **`#-`**) - the metadata tables
//! - **`#Strings`** - null-terminated UTF-8 names, referenced by byte offset
//! - **`#Blob`** - length-prefixed binary data such as public keys
//!
//! `#GUID` and `#US` are located by the root but never read.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers

mod blob;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::TablesHeader;
