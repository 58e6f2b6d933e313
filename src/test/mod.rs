//! Shared fixtures for unit tests.
//!
//! [`MockLoader`] writes real images for input files, since the analyzer sniffs them on
//! disk, and answers loads by identity from a table of scripted outcomes.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;

use crate::{
    builder::ImageBuilder,
    identity::{AssemblyIdentity, AssemblyVersion},
    loader::{AssemblyMetadata, MetadataLoader, PeMetadataLoader},
    Error, Result,
};

/// Parses a version literal.
pub fn version(value: &str) -> AssemblyVersion {
    AssemblyVersion::parse(value).unwrap()
}

/// An unsigned, neutral identity at version 1.0.0.0.
pub fn identity(name: &str) -> AssemblyIdentity {
    AssemblyIdentity::new(name, version("1.0.0.0"))
}

/// Metadata for `name` at `version` without references.
pub fn metadata(name: &str, version_str: &str, location: &str) -> Arc<AssemblyMetadata> {
    Arc::new(AssemblyMetadata {
        identity: AssemblyIdentity::new(name, version(version_str)),
        references: Vec::new(),
        location: PathBuf::from(location),
        global_cache: false,
    })
}

#[derive(Debug, Clone, Copy)]
enum Scripted {
    GlobalCache,
    Elsewhere,
    Failure,
}

/// A loader over images in a temporary directory plus scripted identity loads.
///
/// Identities without a script are not found.
pub struct MockLoader {
    dir: TempDir,
    files: PeMetadataLoader,
    scripted: HashMap<String, Scripted>,
}

impl MockLoader {
    pub fn new() -> Self {
        MockLoader {
            dir: tempfile::tempdir().unwrap(),
            files: PeMetadataLoader::new(),
            scripted: HashMap::new(),
        }
    }

    /// Writes `<name>.dll` declaring `name` at `version_str`.
    pub fn file(&mut self, name: &str, version_str: &str, references: &[AssemblyIdentity]) -> PathBuf {
        self.file_with(
            &format!("{name}.dll"),
            AssemblyIdentity::new(name, version(version_str)),
            references,
        )
    }

    /// Writes `file_name` declaring `identity`.
    pub fn file_with(
        &mut self,
        file_name: &str,
        identity: AssemblyIdentity,
        references: &[AssemblyIdentity],
    ) -> PathBuf {
        let builder = references
            .iter()
            .fold(ImageBuilder::from_identity(&identity), |builder, reference| {
                builder.reference(reference.clone())
            });

        let path = self.dir.path().join(file_name);
        builder.write(&path).unwrap();
        path
    }

    /// The directory holding the written images.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// `identity` loads from the global cache.
    pub fn global(&mut self, identity: &AssemblyIdentity) {
        self.scripted.insert(identity.key(), Scripted::GlobalCache);
    }

    /// `identity` loads from an unknown location.
    pub fn elsewhere(&mut self, identity: &AssemblyIdentity) {
        self.scripted.insert(identity.key(), Scripted::Elsewhere);
    }

    /// Loading `identity` fails with a hard error.
    pub fn fail(&mut self, identity: &AssemblyIdentity) {
        self.scripted.insert(identity.key(), Scripted::Failure);
    }
}

impl MetadataLoader for MockLoader {
    fn load_file(&self, path: &Path) -> Result<AssemblyMetadata> {
        self.files.load_file(path)
    }

    fn load_identity(&self, identity: &AssemblyIdentity) -> Result<AssemblyMetadata> {
        match self.scripted.get(&identity.key()) {
            Some(Scripted::Failure) => Err(Error::AssemblyMismatch {
                requested: identity.display_name(),
                found: format!("{}, Version=0.0.0.0", identity.name),
            }),
            Some(scripted) => Ok(AssemblyMetadata {
                identity: identity.clone(),
                references: Vec::new(),
                location: PathBuf::from(format!("/scripted/{}.dll", identity.name)),
                global_cache: matches!(scripted, Scripted::GlobalCache),
            }),
            None => Err(Error::AssemblyNotFound(identity.display_name())),
        }
    }
}
