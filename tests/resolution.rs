//! Loading referenced assemblies by identity: global caches, search directories,
//! mismatching binaries and binding redirects.

use std::{fs, path::Path, sync::Arc};

use dotdeps::{
    builder::ImageBuilder,
    classify::AssemblySource,
    diagnostics::{DiagnosticCategory, Diagnostics},
    identity::{AssemblyIdentity, AssemblyVersion},
    loader::PeMetadataLoader,
    redirect::BindingRedirects,
    AnalysisResult, DependencyAnalyzer, Error,
};
use tempfile::TempDir;

const KEY: [u8; 160] = [0x5A; 160];

fn version(value: &str) -> AssemblyVersion {
    AssemblyVersion::parse(value).unwrap()
}

fn signed(name: &str, value: &str) -> ImageBuilder {
    ImageBuilder::new(name)
        .version(version(value))
        .public_key(KEY.to_vec())
}

fn write_app(dir: &Path, references: Vec<AssemblyIdentity>) -> std::path::PathBuf {
    let path = dir.join("App.exe");
    references
        .into_iter()
        .fold(ImageBuilder::new("App"), ImageBuilder::reference)
        .write(&path)
        .unwrap();
    path
}

fn analyze(
    files: Vec<std::path::PathBuf>,
    loader: PeMetadataLoader,
) -> (AnalysisResult, Diagnostics) {
    let diagnostics = Diagnostics::new();
    let result = DependencyAnalyzer::new(files)
        .with_loader(Arc::new(loader))
        .analyze(&diagnostics);
    (result, diagnostics)
}

fn node_named<'a>(result: &'a AnalysisResult, name: &str) -> &'a dotdeps::graph::AssemblyNode {
    result
        .assemblies()
        .find(|node| node.identity().name == name)
        .unwrap()
}

#[test]
fn mono_global_cache() {
    let bin = TempDir::new().unwrap();
    let gac = TempDir::new().unwrap();

    let lib = signed("Contoso.Core", "1.0.0.0");
    let identity = lib.identity();
    let token = identity.public_key_token.unwrap();
    let dir = gac
        .path()
        .join("Contoso.Core")
        .join(format!("1.0.0.0__{token}"));
    fs::create_dir_all(&dir).unwrap();
    let location = dir.join("Contoso.Core.dll");
    lib.write(&location).unwrap();

    let app = write_app(bin.path(), vec![identity]);
    let (result, diagnostics) = analyze(
        vec![app],
        PeMetadataLoader::new().with_global_cache(gac.path()),
    );

    let node = node_named(&result, "Contoso.Core");
    assert_eq!(node.source(), AssemblySource::GlobalCache);
    assert_eq!(node.location(), Some(location.as_path()));
    assert!(node.origin_file_name().is_none());
    assert!(!diagnostics.has_warnings());
    assert!(result.missing_assemblies().is_empty());
}

#[test]
fn framework_global_cache_with_culture() {
    let bin = TempDir::new().unwrap();
    let gac = TempDir::new().unwrap();

    let lib = signed("Contoso.Resources", "4.0.0.0").culture("de");
    let identity = lib.identity();
    let token = identity.public_key_token.unwrap();
    let dir = gac
        .path()
        .join("Contoso.Resources")
        .join(format!("v4.0_4.0.0.0_de_{token}"));
    fs::create_dir_all(&dir).unwrap();
    lib.write(&dir.join("Contoso.Resources.dll")).unwrap();

    let app = write_app(bin.path(), vec![identity]);
    let (result, _) = analyze(
        vec![app],
        PeMetadataLoader::new().with_global_cache(gac.path()),
    );

    assert_eq!(
        node_named(&result, "Contoso.Resources").source(),
        AssemblySource::GlobalCache
    );
}

#[test]
fn unsigned_reference_skips_global_cache() {
    let bin = TempDir::new().unwrap();
    let gac = TempDir::new().unwrap();

    let dir = gac.path().join("Lib").join("1.0.0.0__");
    fs::create_dir_all(&dir).unwrap();
    ImageBuilder::new("Lib").write(&dir.join("Lib.dll")).unwrap();

    let app = write_app(
        bin.path(),
        vec![AssemblyIdentity::new("Lib", version("1.0.0.0"))],
    );
    let (result, _) = analyze(
        vec![app],
        PeMetadataLoader::new().with_global_cache(gac.path()),
    );

    assert_eq!(node_named(&result, "Lib").source(), AssemblySource::NotFound);
}

#[test]
fn search_directory_is_unknown_source() {
    let bin = TempDir::new().unwrap();
    let search = TempDir::new().unwrap();

    let location = search.path().join("Lib.exe");
    ImageBuilder::new("Lib")
        .version(version("1.2.0.0"))
        .write(&location)
        .unwrap();

    let app = write_app(
        bin.path(),
        vec![AssemblyIdentity::new("Lib", version("1.0.0.0"))],
    );
    let (result, _) = analyze(
        vec![app],
        PeMetadataLoader::new().with_search_path(search.path()),
    );

    let node = node_named(&result, "Lib");
    assert_eq!(node.source(), AssemblySource::Unknown);
    assert_eq!(node.location(), Some(location.as_path()));
    // The node keeps the requested identity; the binary's own version is on the metadata.
    assert_eq!(node.identity().version, version("1.0.0.0"));
    assert_eq!(
        node.metadata().unwrap().identity.version,
        version("1.2.0.0")
    );
}

#[test]
fn mismatching_binary_is_a_hard_error() {
    let bin = TempDir::new().unwrap();
    let search = TempDir::new().unwrap();

    ImageBuilder::new("Lib")
        .write(&search.path().join("Lib.dll"))
        .unwrap();
    let local = bin.path().join("Lib.dll");
    ImageBuilder::new("Lib")
        .version(version("3.0.0.0"))
        .write(&local)
        .unwrap();

    let app = write_app(
        bin.path(),
        vec![AssemblyIdentity::new("Lib", version("2.0.0.0"))],
    );
    let (result, diagnostics) = analyze(
        vec![app, local],
        PeMetadataLoader::new().with_search_path(search.path()),
    );

    let requested = result
        .get("Lib, Version=2.0.0.0, Culture=neutral, PublicKeyToken=null")
        .unwrap();
    assert_eq!(requested.source(), AssemblySource::NotFound);
    assert!(!requested.has_alternative_version());
    assert!(requested.is_missing());

    let resolution = diagnostics.by_category(DiagnosticCategory::Resolution);
    assert_eq!(resolution.len(), 2);
    assert_eq!(resolution[0].message, "Checking reference Lib");
    assert_eq!(
        resolution[1].message,
        "Failed to load assembly 'Lib, Version=2.0.0.0, Culture=neutral, PublicKeyToken=null': \
         Assembly 'Lib, Version=2.0.0.0, Culture=neutral, PublicKeyToken=null' resolved to \
         'Lib, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null' which does not match"
    );
    assert!(diagnostics.has_errors());
}

#[test]
fn loader_reports_not_found_and_mismatch() {
    let search = TempDir::new().unwrap();
    ImageBuilder::new("Lib")
        .write(&search.path().join("Lib.dll"))
        .unwrap();
    let loader = PeMetadataLoader::new().with_search_path(search.path());

    let gone = AssemblyIdentity::new("Gone", version("1.0.0.0"));
    let error = dotdeps::loader::MetadataLoader::load_identity(&loader, &gone).unwrap_err();
    assert!(error.is_not_found());
    assert_eq!(
        error.to_string(),
        "Could not find assembly 'Gone, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null'"
    );

    let newer = AssemblyIdentity::new("Lib", version("2.0.0.0"));
    let error = dotdeps::loader::MetadataLoader::load_identity(&loader, &newer).unwrap_err();
    assert!(matches!(error, Error::AssemblyMismatch { .. }));
    assert!(!error.is_not_found());
}

#[test]
fn binding_redirects_collapse_versions() {
    let bin = TempDir::new().unwrap();
    let config = bin.path().join("App.exe.config");
    fs::write(
        &config,
        r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
  <runtime>
    <assemblyBinding xmlns="urn:schemas-microsoft-com:asm.v1">
      <dependentAssembly>
        <assemblyIdentity name="Lib" culture="neutral" />
        <bindingRedirect oldVersion="0.0.0.0-2.0.0.0" newVersion="2.0.0.0" />
      </dependentAssembly>
    </assemblyBinding>
  </runtime>
</configuration>"#,
    )
    .unwrap();

    let app = write_app(
        bin.path(),
        vec![AssemblyIdentity::new("Lib", version("1.0.0.0"))],
    );
    let tool = bin.path().join("Tool.dll");
    ImageBuilder::new("Tool")
        .reference(AssemblyIdentity::new("Lib", version("1.5.0.0")))
        .write(&tool)
        .unwrap();
    let lib = bin.path().join("Lib.dll");
    ImageBuilder::new("Lib")
        .version(version("2.0.0.0"))
        .write(&lib)
        .unwrap();

    let redirects = BindingRedirects::from_config(&config).unwrap();
    let diagnostics = Diagnostics::new();
    let result = DependencyAnalyzer::new(vec![app, tool, lib])
        .with_loader(Arc::new(PeMetadataLoader::new()))
        .with_redirect_policy(Arc::new(redirects))
        .analyze(&diagnostics);

    assert_eq!(result.len(), 3);
    let node = node_named(&result, "Lib");
    assert_eq!(node.source(), AssemblySource::Local);
    assert_eq!(node.referenced_by_count(), 2);
    assert!(!diagnostics.has_warnings());
}

#[test]
fn redirected_missing_reference_reports_effective_identity() {
    let bin = TempDir::new().unwrap();
    let redirects = BindingRedirects::parse(
        r#"<configuration><runtime><assemblyBinding xmlns="urn:schemas-microsoft-com:asm.v1">
             <dependentAssembly>
               <assemblyIdentity name="Lib" />
               <bindingRedirect oldVersion="1.0.0.0" newVersion="2.0.0.0" />
             </dependentAssembly>
           </assemblyBinding></runtime></configuration>"#,
    )
    .unwrap();

    let app = write_app(
        bin.path(),
        vec![AssemblyIdentity::new("Lib", version("1.0.0.0"))],
    );
    let diagnostics = Diagnostics::new();
    let result = DependencyAnalyzer::new(vec![app])
        .with_loader(Arc::new(PeMetadataLoader::new()))
        .with_redirect_policy(Arc::new(redirects))
        .analyze(&diagnostics);

    let node = node_named(&result, "Lib");
    assert!(node.is_redirected());
    assert_eq!(node.identity().version, version("1.0.0.0"));
    assert_eq!(node.effective_identity().version, version("2.0.0.0"));
    assert_eq!(
        diagnostics.warnings()[0].message,
        "Could not find assembly 'Lib, Version=2.0.0.0, Culture=neutral, PublicKeyToken=null'"
    );
}

#[test]
fn missing_configuration_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Nope.config");

    let error = BindingRedirects::from_config(&path).unwrap_err();
    assert!(matches!(error, Error::ConfigurationNotFound(_)));
    assert_eq!(
        error.to_string(),
        format!("Directory or file: '{}' does not exist.", path.display())
    );
}

#[test]
fn malformed_configuration_file() {
    let error = BindingRedirects::parse("<configuration><runtime></configuration>").unwrap_err();
    assert!(matches!(error, Error::Configuration(_)));
}
