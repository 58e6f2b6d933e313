//! The dependency analyzer.
//!
//! [`DependencyAnalyzer`] turns a list of candidate files into an [`AnalysisResult`] in
//! four strictly sequential passes over one [`AssemblyGraph`]:
//!
//! 1. **Local resolution** - every candidate that passes the sniffer is loaded and becomes a
//!    `Local` node.
//! 2. **Reference mapping** - every reference of a resolved node becomes a node and an edge.
//! 3. **Non-file resolution** - every node still lacking metadata is loaded by identity;
//!    a "not found" outcome may borrow a same-named resolved node as alternative version.
//! 4. **Roots and reachability** - roots are designated and everything reachable from them
//!    is marked.
//!
//! Loading is the expensive part and is done in parallel with `rayon` in passes 1 and 3.
//! Graph mutation and reporting happen afterwards on one thread, in sorted order, so the
//! graph and the message sequence do not depend on scheduling or on the order the files
//! were listed in.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotdeps::prelude::*;
//! use std::sync::Arc;
//!
//! let files = vec!["bin/App.dll".into(), "bin/Lib.dll".into()];
//! let loader = PeMetadataLoader::new().with_default_locations();
//!
//! let result = DependencyAnalyzer::new(files)
//!     .with_loader(Arc::new(loader))
//!     .with_options(AnalysisOptions::new().skip_system(true))
//!     .analyze(&LogSink);
//!
//! for node in result.missing_assemblies() {
//!     println!("missing: {}", node.effective_identity());
//! }
//! ```

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::debug;
use rayon::prelude::*;

use crate::{
    classify::{is_system_identity, starts_with_ignore_case, AssemblySource},
    diagnostics::{DiagnosticCategory, DiagnosticSink},
    graph::{AssemblyGraph, NodeId},
    identity::AssemblyIdentity,
    loader::{AssemblyMetadata, MetadataLoader, PeMetadataLoader},
    redirect::{NoRedirect, RedirectPolicy},
    result::AnalysisResult,
    sniffer::is_loadable_file,
    Result,
};

/// Filters and presentation flags for one analysis.
///
/// The filters shape the graph itself: an identity rejected by
/// [`AnalysisOptions::accepts`] gets no node, and a reference to it gets no edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Drop identities that look like platform assemblies.
    pub skip_system: bool,
    /// Presentation hint: only show names with conflicting versions. The graph is not
    /// affected.
    pub only_conflicts: bool,
    /// Keep only identities whose display name starts with this prefix, ignoring case.
    pub referenced_name_prefix: Option<String>,
    /// Drop identities whose simple name starts with any of these prefixes, ignoring case.
    pub excluded_name_prefixes: Vec<String>,
}

impl AnalysisOptions {
    /// Options that keep every identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`AnalysisOptions::skip_system`].
    #[must_use]
    pub fn skip_system(mut self, skip: bool) -> Self {
        self.skip_system = skip;
        self
    }

    /// Sets [`AnalysisOptions::only_conflicts`].
    #[must_use]
    pub fn only_conflicts(mut self, only: bool) -> Self {
        self.only_conflicts = only;
        self
    }

    /// Sets [`AnalysisOptions::referenced_name_prefix`]. An empty prefix clears it.
    #[must_use]
    pub fn referenced_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.referenced_name_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Adds an excluded simple-name prefix. Empty prefixes are ignored.
    #[must_use]
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !prefix.is_empty() {
            self.excluded_name_prefixes.push(prefix);
        }
        self
    }

    /// Returns `true` if `identity` passes every filter.
    #[must_use]
    pub fn accepts(&self, identity: &AssemblyIdentity) -> bool {
        if self.skip_system && is_system_identity(identity) {
            return false;
        }

        if let Some(prefix) = &self.referenced_name_prefix {
            if !starts_with_ignore_case(&identity.display_name(), prefix) {
                return false;
            }
        }

        !self
            .excluded_name_prefixes
            .iter()
            .any(|prefix| starts_with_ignore_case(&identity.name, prefix))
    }
}

enum FileOutcome {
    NotLoadable,
    Loaded(AssemblyMetadata),
    Failed(crate::Error),
}

/// Builds the reference graph of a set of files.
///
/// Defaults: a [`PeMetadataLoader`] without caches or search paths, [`NoRedirect`], no
/// filters and no root file.
pub struct DependencyAnalyzer {
    files: Vec<PathBuf>,
    loader: Arc<dyn MetadataLoader>,
    redirects: Arc<dyn RedirectPolicy>,
    options: AnalysisOptions,
    root_file: Option<String>,
}

impl DependencyAnalyzer {
    /// Creates an analyzer over `files`. An empty list yields an empty result.
    #[must_use]
    pub fn new(files: Vec<PathBuf>) -> Self {
        DependencyAnalyzer {
            files,
            loader: Arc::new(PeMetadataLoader::new()),
            redirects: Arc::new(NoRedirect),
            options: AnalysisOptions::default(),
            root_file: None,
        }
    }

    /// Replaces the metadata loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn MetadataLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replaces the redirect policy.
    #[must_use]
    pub fn with_redirect_policy(mut self, redirects: Arc<dyn RedirectPolicy>) -> Self {
        self.redirects = redirects;
        self
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Designates the node loaded from the file named `file_name` as the only root.
    #[must_use]
    pub fn with_root_file(mut self, file_name: impl Into<String>) -> Self {
        self.root_file = Some(file_name.into());
        self
    }

    /// The files to analyze.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Runs the analysis.
    ///
    /// Per-file and per-reference failures are reported to `sink` and never abort the run.
    pub fn analyze(&self, sink: &dyn DiagnosticSink) -> AnalysisResult {
        let mut graph = AssemblyGraph::new();

        self.resolve_local(&mut graph, sink);
        self.map_references(&mut graph, sink);
        self.resolve_references(&mut graph, sink);
        let roots = self.discover_roots(&graph, sink);
        graph.mark_reachable(&roots);

        AnalysisResult::new(graph, self.files.clone(), roots, self.options.clone())
    }

    /// Returns the node for `identity`, or `None` if a filter rejects it.
    fn register(&self, graph: &mut AssemblyGraph, identity: &AssemblyIdentity) -> Option<NodeId> {
        if !self.options.accepts(identity) {
            return None;
        }

        let effective = self.redirects.apply(identity);
        Some(graph.get_or_insert(identity.clone(), effective))
    }

    fn resolve_local(&self, graph: &mut AssemblyGraph, sink: &dyn DiagnosticSink) {
        let mut files: Vec<&PathBuf> = self.files.iter().collect();
        files.sort_by(|a, b| file_name(a).cmp(&file_name(b)).then_with(|| a.cmp(b)));

        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|path| {
                if !is_loadable_file(path) {
                    return FileOutcome::NotLoadable;
                }
                match self.loader.load_file(path) {
                    Ok(metadata) => FileOutcome::Loaded(metadata),
                    Err(error) => FileOutcome::Failed(error),
                }
            })
            .collect();

        for (path, outcome) in files.into_iter().zip(outcomes) {
            let name = file_name(path);
            sink.info(
                DiagnosticCategory::Discovery,
                &format!("Checking file {name}"),
            );

            let metadata = match outcome {
                FileOutcome::NotLoadable => {
                    debug!("Skipping {}, not a managed binary", path.display());
                    continue;
                }
                FileOutcome::Failed(error) => {
                    sink.error(
                        DiagnosticCategory::Discovery,
                        &format!("Failed to load assembly '{}': {}", path.display(), error),
                    );
                    continue;
                }
                FileOutcome::Loaded(metadata) => metadata,
            };

            let Some(id) = self.register(graph, &metadata.identity) else {
                continue;
            };

            if !graph.resolve(id, AssemblySource::Local, Arc::new(metadata), Some(name)) {
                debug!(
                    "{} declares the same identity as {}, keeping the first",
                    path.display(),
                    graph.node(id).origin_file_name().unwrap_or_default()
                );
            }
        }
    }

    fn map_references(&self, graph: &mut AssemblyGraph, sink: &dyn DiagnosticSink) {
        let resolved: Vec<(NodeId, Arc<AssemblyMetadata>)> = graph
            .iter()
            .filter_map(|node| node.metadata().map(|metadata| (node.id(), Arc::clone(metadata))))
            .collect();

        for (source, metadata) in resolved {
            for reference in &metadata.references {
                let Some(target) = self.register(graph, reference) else {
                    continue;
                };

                sink.info(
                    DiagnosticCategory::Reference,
                    &format!("Found reference {}", reference.display_name()),
                );
                graph.add_reference(source, target);
            }
        }
    }

    fn resolve_references(&self, graph: &mut AssemblyGraph, sink: &dyn DiagnosticSink) {
        let mut pending: Vec<(String, String, NodeId, AssemblyIdentity)> = graph
            .iter()
            .filter(|node| node.metadata().is_none())
            .map(|node| {
                (
                    node.identity().name.to_lowercase(),
                    node.key().to_string(),
                    node.id(),
                    node.effective_identity().clone(),
                )
            })
            .collect();
        pending.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

        let outcomes: Vec<Result<AssemblyMetadata>> = pending
            .par_iter()
            .map(|(_, _, _, identity)| self.loader.load_identity(identity))
            .collect();

        for ((_, _, id, identity), outcome) in pending.into_iter().zip(outcomes) {
            sink.info(
                DiagnosticCategory::Resolution,
                &format!("Checking reference {}", identity.name),
            );

            match outcome {
                Ok(metadata) => {
                    let source = if metadata.global_cache {
                        AssemblySource::GlobalCache
                    } else {
                        AssemblySource::Unknown
                    };
                    graph.resolve(id, source, Arc::new(metadata), None);
                }
                Err(error) if error.is_not_found() => {
                    match find_alternative(graph, id) {
                        Some(alternative) => {
                            sink.warning(
                                DiagnosticCategory::Resolution,
                                &format!(
                                    "Could not find assembly '{}', using alternative version {}",
                                    identity.display_name(),
                                    alternative_version_label(graph, alternative)
                                ),
                            );
                            graph.set_alternative_version(id, alternative);
                        }
                        None => sink.warning(
                            DiagnosticCategory::Resolution,
                            &format!("Could not find assembly '{}'", identity.display_name()),
                        ),
                    }
                }
                Err(error) => sink.error(
                    DiagnosticCategory::Resolution,
                    &format!(
                        "Failed to load assembly '{}': {}",
                        identity.display_name(),
                        error
                    ),
                ),
            }
        }
    }

    fn discover_roots(&self, graph: &AssemblyGraph, sink: &dyn DiagnosticSink) -> Vec<NodeId> {
        let Some(root_file) = &self.root_file else {
            return graph
                .iter_by_key()
                .filter(|node| node.referenced_by_count() == 0)
                .map(|node| node.id())
                .collect();
        };

        let root = graph.iter_by_key().find(|node| {
            node.origin_file_name()
                .is_some_and(|origin| origin.eq_ignore_ascii_case(root_file))
        });

        if let Some(root) = root {
            return vec![root.id()];
        }

        let mut known: Vec<&str> = graph.iter().filter_map(|node| node.origin_file_name()).collect();
        known.sort_unstable();
        sink.error(
            DiagnosticCategory::Root,
            &format!(
                "Could not find root file '{}'. Known files: {}",
                root_file,
                known.join(", ")
            ),
        );

        Vec::new()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Picks the resolved node with the same simple name whose version is the best stand-in
/// for the one requested by `id`. Remaining ties go to the lowest display name.
fn find_alternative(graph: &AssemblyGraph, id: NodeId) -> Option<NodeId> {
    let missing = graph.node(id);
    let target = missing.effective_identity().version;

    graph
        .iter()
        .filter(|node| node.id() != id && node.identity().same_name(missing.identity()))
        .filter_map(|node| node.metadata().map(|metadata| (node, metadata)))
        .min_by(|(a, a_meta), (b, b_meta)| {
            let a_version = a_meta.identity.version;
            let b_version = b_meta.identity.version;
            if a_version.is_closer_to(&b_version, &target) {
                Ordering::Less
            } else if b_version.is_closer_to(&a_version, &target) {
                Ordering::Greater
            } else {
                a.effective_identity()
                    .display_name()
                    .cmp(&b.effective_identity().display_name())
            }
        })
        .map(|(node, _)| node.id())
}

fn alternative_version_label(graph: &AssemblyGraph, alternative: NodeId) -> String {
    let node = graph.node(alternative);
    node.metadata()
        .map_or(node.effective_identity().version, |metadata| metadata.identity.version)
        .to_string()
}
