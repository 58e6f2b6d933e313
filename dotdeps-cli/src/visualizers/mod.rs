//! Console views and file exporters over an [`AnalysisResult`].
//!
//! Every visualizer reads the finished result; none of them changes it. Console views
//! build colored lines through pure functions so they can be tested without a terminal, and
//! exporters build the whole document in memory before a single write.

mod binding_redirect;
mod console;
mod dgml;
mod dot;
mod tree;
mod unreferenced;
mod xml;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use dotdeps::{
    classify::{starts_with_ignore_case, AssemblySource},
    diagnostics::{DiagnosticCategory, DiagnosticSink},
    graph::AssemblyNode,
    AnalysisResult,
};

use crate::{app::Cli, console::print_lines};

/// Presentation settings shared by all visualizers.
#[derive(Debug, Clone, Default)]
pub struct VisualizerOptions {
    pub skip_system: bool,
    pub only_conflicts: bool,
    pub referenced_name_prefix: Option<String>,
    pub dgml_show_version: bool,
    pub color: bool,
}

impl VisualizerOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        VisualizerOptions {
            skip_system: cli.nonsystem,
            only_conflicts: !cli.all,
            referenced_name_prefix: cli
                .referenced_starts_with
                .clone()
                .filter(|prefix| !prefix.is_empty()),
            dgml_show_version: cli.visualizers.dgml_show_version,
            color: !cli.no_color,
        }
    }

    /// Returns `true` if `name` passes the referer prefix filter.
    fn accepts_referer(&self, name: &str) -> bool {
        self.referenced_name_prefix
            .as_deref()
            .map_or(true, |prefix| starts_with_ignore_case(name, prefix))
    }
}

/// The available views and exporters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visualizer {
    /// Conflict listing, on unless `--noconsole`.
    Console { enabled: bool },
    /// Dependency tree from the roots.
    Tree { enabled: bool },
    /// Input files nothing references.
    Unreferenced { enabled: bool },
    Dgml { path: Option<PathBuf> },
    Dot { path: Option<PathBuf> },
    Xml { path: Option<PathBuf> },
    BindingRedirect { path: Option<PathBuf> },
}

impl Visualizer {
    /// Every visualizer, unconfigured, in output order.
    pub fn all() -> [Visualizer; 7] {
        [
            Visualizer::Console { enabled: false },
            Visualizer::Tree { enabled: false },
            Visualizer::Unreferenced { enabled: false },
            Visualizer::Dgml { path: None },
            Visualizer::Dot { path: None },
            Visualizer::Xml { path: None },
            Visualizer::BindingRedirect { path: None },
        ]
    }

    /// The enabled visualizers for `cli`, in output order.
    pub fn configured(cli: &Cli) -> Vec<Visualizer> {
        Self::all()
            .into_iter()
            .map(|visualizer| visualizer.configure(cli))
            .filter(Visualizer::is_enabled)
            .collect()
    }

    /// Takes this visualizer's switches from the command line.
    #[must_use]
    pub fn configure(self, cli: &Cli) -> Self {
        let args = &cli.visualizers;
        match self {
            Visualizer::Console { .. } => Visualizer::Console {
                enabled: !args.no_console && !cli.json,
            },
            Visualizer::Tree { .. } => Visualizer::Tree {
                enabled: args.tree && !cli.json,
            },
            Visualizer::Unreferenced { .. } => Visualizer::Unreferenced {
                enabled: args.unref && !cli.json,
            },
            Visualizer::Dgml { .. } => Visualizer::Dgml {
                path: args.dgml.clone(),
            },
            Visualizer::Dot { .. } => Visualizer::Dot {
                path: args.dot.clone(),
            },
            Visualizer::Xml { .. } => Visualizer::Xml {
                path: args.xml.clone(),
            },
            Visualizer::BindingRedirect { .. } => Visualizer::BindingRedirect {
                path: args.binding_redirect.clone(),
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Visualizer::Console { enabled }
            | Visualizer::Tree { enabled }
            | Visualizer::Unreferenced { enabled } => *enabled,
            Visualizer::Dgml { path }
            | Visualizer::Dot { path }
            | Visualizer::Xml { path }
            | Visualizer::BindingRedirect { path } => path.is_some(),
        }
    }

    /// Renders `result` to the terminal or to this visualizer's file.
    ///
    /// Write failures of exporters are reported to `sink` and do not fail the run.
    pub fn render(
        &self,
        result: &AnalysisResult,
        options: &VisualizerOptions,
        sink: &dyn DiagnosticSink,
    ) -> anyhow::Result<()> {
        match self {
            Visualizer::Console { enabled: true } => {
                print_lines(&console::lines(result, options), options.color)?;
            }
            Visualizer::Tree { enabled: true } => {
                print_lines(&tree::lines(result, options), options.color)?;
            }
            Visualizer::Unreferenced { enabled: true } => {
                print_lines(&unreferenced::lines(result), options.color)?;
            }
            Visualizer::Dgml { path: Some(path) } => {
                export(path, sink, || dgml::render(result, options))?;
            }
            Visualizer::Dot { path: Some(path) } => {
                export(path, sink, || Ok(dot::render(result, options)))?;
            }
            Visualizer::Xml { path: Some(path) } => {
                export(path, sink, || xml::render(result, options))?;
            }
            Visualizer::BindingRedirect { path: Some(path) } => {
                export(path, sink, || binding_redirect::render(result))?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Builds a document and writes it to `path`, logging the outcome.
fn export(
    path: &Path,
    sink: &dyn DiagnosticSink,
    document: impl FnOnce() -> anyhow::Result<String>,
) -> anyhow::Result<()> {
    sink.info(
        DiagnosticCategory::Export,
        &format!("Exporting to {}...", path.display()),
    );

    let contents = document()?;
    match fs::write(path, contents) {
        Ok(()) => sink.info(
            DiagnosticCategory::Export,
            &format!("Exported to file {}", path.display()),
        ),
        Err(e) => sink.error(
            DiagnosticCategory::Export,
            &format!("Could not write file {} due to error {}", path.display(), e),
        ),
    }
    Ok(())
}

/// Nodes sharing a simple name (case-insensitive), groups ordered by name and members by
/// key.
pub(crate) fn name_groups(result: &AnalysisResult) -> Vec<Vec<&AssemblyNode>> {
    let mut groups: BTreeMap<String, Vec<&AssemblyNode>> = BTreeMap::new();
    for node in result.assemblies() {
        groups
            .entry(node.effective_identity().name.to_lowercase())
            .or_default()
            .push(node);
    }
    groups.into_values().collect()
}

/// A group that is one locally resolved assembly has nothing to report.
pub(crate) fn is_single_local(group: &[&AssemblyNode]) -> bool {
    matches!(group, [node] if node.source() == AssemblySource::Local)
}
