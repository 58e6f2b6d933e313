use std::{
    env,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    identity::AssemblyIdentity,
    loader::{AssemblyMetadata, MetadataLoader},
    metadata::AssemblyManifest,
    Error, Result,
};

/// Mono global assembly cache roots.
const MONO_GAC_ROOTS: [&str; 3] = [
    "/usr/lib/mono/gac",
    "/usr/local/lib/mono/gac",
    "/Library/Frameworks/Mono.framework/Versions/Current/lib/mono/gac",
];

/// .NET Framework global assembly cache roots, relative to `%WINDIR%`.
const WINDOWS_GAC_ROOTS: [&str; 6] = [
    "Microsoft.NET/assembly/GAC_MSIL",
    "Microsoft.NET/assembly/GAC_64",
    "Microsoft.NET/assembly/GAC_32",
    "assembly/GAC_MSIL",
    "assembly/GAC_64",
    "assembly/GAC_32",
];

const SEARCH_EXTENSIONS: [&str; 2] = ["dll", "exe"];

/// Reads manifests from PE images and locates identities on disk.
///
/// Identities are probed first in every configured global cache, then in every search
/// directory:
///
/// - `<cache>/<Name>/<Version>_<Culture>_<Token>/<Name>.dll` (Mono layout)
/// - `<cache>/<Name>/v4.0_<Version>_<Culture>_<Token>/<Name>.dll` (.NET Framework 4 layout)
/// - `<search>/<Name>.dll`, then `<search>/<Name>.exe`
///
/// `<Culture>` is empty for neutral assemblies. Only strong-named identities are looked
/// up in caches. The first existing candidate decides the outcome: it either satisfies
/// the request or yields [`Error::AssemblyMismatch`].
///
/// # Examples
///
/// ```rust,no_run
/// use dotdeps::loader::{MetadataLoader, PeMetadataLoader};
/// use std::path::Path;
///
/// let loader = PeMetadataLoader::new();
/// let metadata = loader.load_file(Path::new("bin/App.dll"))?;
/// for reference in &metadata.references {
///     println!("{reference}");
/// }
/// # Ok::<(), dotdeps::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PeMetadataLoader {
    global_caches: Vec<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl PeMetadataLoader {
    /// Creates a loader without caches or search directories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global assembly cache root.
    #[must_use]
    pub fn with_global_cache<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.global_caches.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds a directory probed for `<Name>.dll` and `<Name>.exe`.
    #[must_use]
    pub fn with_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the well-known Mono and .NET Framework cache roots that exist on this machine.
    #[must_use]
    pub fn with_default_locations(mut self) -> Self {
        let mut candidates: Vec<PathBuf> = MONO_GAC_ROOTS.iter().map(PathBuf::from).collect();
        if let Some(windir) = env::var_os("WINDIR") {
            let windir = PathBuf::from(windir);
            candidates.extend(WINDOWS_GAC_ROOTS.iter().map(|root| windir.join(root)));
        }

        for candidate in candidates {
            if candidate.is_dir() {
                debug!("Using global assembly cache {}", candidate.display());
                self.global_caches.push(candidate);
            }
        }

        self
    }

    /// The configured global cache roots.
    #[must_use]
    pub fn global_caches(&self) -> &[PathBuf] {
        &self.global_caches
    }

    /// The configured search directories.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn cache_candidates(&self, identity: &AssemblyIdentity) -> Vec<PathBuf> {
        let Some(token) = identity.public_key_token else {
            return Vec::new();
        };

        let culture = identity.culture.as_deref().unwrap_or_default();
        let file_name = format!("{}.dll", identity.name);
        let mono = format!("{}_{}_{}", identity.version, culture, token);
        let framework = format!("v4.0_{}_{}_{}", identity.version, culture, token);

        self.global_caches
            .iter()
            .flat_map(|root| {
                let base = root.join(&identity.name);
                [
                    base.join(&mono).join(&file_name),
                    base.join(&framework).join(&file_name),
                ]
            })
            .collect()
    }

    fn search_candidates(&self, identity: &AssemblyIdentity) -> Vec<PathBuf> {
        self.search_paths
            .iter()
            .flat_map(|dir| {
                SEARCH_EXTENSIONS
                    .iter()
                    .map(move |extension| dir.join(format!("{}.{}", identity.name, extension)))
            })
            .collect()
    }

    fn load_candidate(
        &self,
        requested: &AssemblyIdentity,
        path: &Path,
        global_cache: bool,
    ) -> Result<AssemblyMetadata> {
        let mut metadata = self.load_file(path)?;
        if !metadata.identity.satisfies(requested) {
            return Err(Error::AssemblyMismatch {
                requested: requested.display_name(),
                found: metadata.identity.display_name(),
            });
        }

        metadata.global_cache = global_cache;
        Ok(metadata)
    }
}

impl MetadataLoader for PeMetadataLoader {
    fn load_file(&self, path: &Path) -> Result<AssemblyMetadata> {
        let manifest = AssemblyManifest::from_file(path)?;

        Ok(AssemblyMetadata {
            identity: manifest.identity,
            references: manifest.references,
            location: path.to_path_buf(),
            global_cache: false,
        })
    }

    fn load_identity(&self, identity: &AssemblyIdentity) -> Result<AssemblyMetadata> {
        for candidate in self.cache_candidates(identity) {
            debug!("Probing {}", candidate.display());
            if candidate.is_file() {
                return self.load_candidate(identity, &candidate, true);
            }
        }

        for candidate in self.search_candidates(identity) {
            debug!("Probing {}", candidate.display());
            if candidate.is_file() {
                return self.load_candidate(identity, &candidate, false);
            }
        }

        Err(Error::AssemblyNotFound(identity.display_name()))
    }
}
