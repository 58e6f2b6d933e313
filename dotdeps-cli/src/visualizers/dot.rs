use std::fmt::Write;

use dotdeps::{classify::AssemblySource, AnalysisResult};

use super::VisualizerOptions;

/// Escapes a string for use inside a quoted DOT label.
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
}

/// A Graphviz digraph. Node ids are the stable graph indices.
pub fn render(result: &AnalysisResult, options: &VisualizerOptions) -> String {
    let shown = |system: bool| !(options.skip_system && system);
    let mut dot = String::new();

    dot.push_str("digraph {\n");
    for node in result.assemblies().filter(|node| shown(node.is_system())) {
        let identity = node.effective_identity();
        let color = if node.source() == AssemblySource::NotFound {
            ", color=red"
        } else {
            ""
        };
        let _ = writeln!(
            dot,
            "    {} [label=\"{}\\n{}\"{color}]",
            node.id(),
            escape_dot(&identity.name),
            identity.version,
        );
    }

    dot.push('\n');

    for node in result.assemblies().filter(|node| shown(node.is_system())) {
        for target in result
            .references(node.id())
            .filter(|target| shown(target.is_system()))
        {
            let _ = writeln!(dot, "    {} -> {};", node.id(), target.id());
        }
    }

    dot.push_str("}\n");
    dot
}
