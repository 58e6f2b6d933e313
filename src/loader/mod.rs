//! Loading assembly metadata from files and by identity.
//!
//! The analyzer never parses binaries itself. It asks a [`MetadataLoader`] for the
//! metadata of an input file, or of an identity that only appeared as a reference. The
//! loader reports one of three outcomes: success, "not found"
//! ([`crate::Error::AssemblyNotFound`]) or a hard failure (any other error).
//!
//! [`PeMetadataLoader`] is the production implementation. It reads manifests straight
//! from PE images and probes global assembly caches and search directories for
//! identities.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotdeps::identity::AssemblyIdentity;
//! use dotdeps::loader::{MetadataLoader, PeMetadataLoader};
//!
//! let loader = PeMetadataLoader::new()
//!     .with_default_locations()
//!     .with_search_path("/opt/app/lib");
//!
//! let identity = AssemblyIdentity::parse(
//!     "System.Xml, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
//! )?;
//! match loader.load_identity(&identity) {
//!     Ok(metadata) => println!("{}", metadata.location.display()),
//!     Err(e) if e.is_not_found() => println!("not found"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # Ok::<(), dotdeps::Error>(())
//! ```

mod pe;

pub use pe::PeMetadataLoader;

use std::path::{Path, PathBuf};

use crate::{identity::AssemblyIdentity, Result};

/// Metadata of one loaded assembly.
///
/// Graph nodes share it as `Arc<AssemblyMetadata>`; a node has metadata exactly when it
/// was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyMetadata {
    /// The identity the binary declares.
    pub identity: AssemblyIdentity,
    /// The identities the binary references, in table order.
    pub references: Vec<AssemblyIdentity>,
    /// Path of the binary that was read.
    pub location: PathBuf,
    /// `true` if the binary was found in a global assembly cache.
    pub global_cache: bool,
}

/// Source of assembly metadata.
///
/// Implementations must be thread-safe: input files are loaded in parallel.
pub trait MetadataLoader: Send + Sync {
    /// Loads the metadata of the binary at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a managed assembly.
    fn load_file(&self, path: &Path) -> Result<AssemblyMetadata>;

    /// Locates and loads a binary that satisfies `identity`.
    ///
    /// # Errors
    /// Returns [`crate::Error::AssemblyNotFound`] if no candidate exists, and any other
    /// error (for example [`crate::Error::AssemblyMismatch`]) if a candidate exists but
    /// cannot serve the request.
    fn load_identity(&self, identity: &AssemblyIdentity) -> Result<AssemblyMetadata>;
}
