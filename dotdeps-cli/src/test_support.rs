//! Fixtures for the visualizer tests: real images in a temporary directory, analyzed with
//! the PE loader.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dotdeps::{
    builder::ImageBuilder,
    diagnostics::Diagnostics,
    identity::{AssemblyIdentity, AssemblyVersion},
    loader::PeMetadataLoader,
    redirect::RedirectPolicy,
    AnalysisOptions, AnalysisResult, DependencyAnalyzer,
};
use tempfile::TempDir;

pub fn identity(name: &str, version: &str) -> AssemblyIdentity {
    AssemblyIdentity::new(name, AssemblyVersion::parse(version).unwrap())
}

pub struct Fixture {
    dir: TempDir,
    gac: TempDir,
    files: Vec<PathBuf>,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            dir: tempfile::tempdir().unwrap(),
            gac: tempfile::tempdir().unwrap(),
            files: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `<name>.dll` with unsigned references.
    pub fn file(&mut self, name: &str, version: &str, references: &[(&str, &str)]) -> PathBuf {
        let builder = references.iter().fold(
            ImageBuilder::from_identity(&identity(name, version)),
            |builder, (name, version)| builder.reference(identity(name, version)),
        );
        self.write(&format!("{name}.dll"), &builder)
    }

    /// Writes `builder` as an input file.
    pub fn write(&mut self, file_name: &str, builder: &ImageBuilder) -> PathBuf {
        let path = self.dir.path().join(file_name);
        builder.write(&path).unwrap();
        self.files.push(path.clone());
        path
    }

    /// Installs a signed image in the Mono global cache layout.
    pub fn global(&self, builder: &ImageBuilder) {
        let identity = builder.identity();
        let token = identity.public_key_token.unwrap();
        let dir = self.gac.path().join(&identity.name).join(format!(
            "{}_{}_{}",
            identity.version,
            identity.culture.as_deref().unwrap_or_default(),
            token
        ));
        std::fs::create_dir_all(&dir).unwrap();
        builder
            .write(&dir.join(format!("{}.dll", identity.name)))
            .unwrap();
    }

    pub fn analyzer(&self, options: AnalysisOptions) -> DependencyAnalyzer {
        let loader = PeMetadataLoader::new().with_global_cache(self.gac.path());
        DependencyAnalyzer::new(self.files.clone())
            .with_loader(Arc::new(loader))
            .with_options(options)
    }

    pub fn analyze(&self) -> AnalysisResult {
        self.analyze_with(AnalysisOptions::new())
    }

    pub fn analyze_with(&self, options: AnalysisOptions) -> AnalysisResult {
        self.analyzer(options).analyze(&Diagnostics::new())
    }

    pub fn analyze_redirected(
        &self,
        options: AnalysisOptions,
        policy: Arc<dyn RedirectPolicy>,
    ) -> AnalysisResult {
        self.analyzer(options)
            .with_redirect_policy(policy)
            .analyze(&Diagnostics::new())
    }
}
