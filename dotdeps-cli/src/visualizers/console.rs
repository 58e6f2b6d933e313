use dotdeps::{classify::AssemblySource, graph::AssemblyNode, AnalysisResult};

use super::{is_single_local, name_groups, VisualizerOptions};
use crate::console::{Color, Line};

pub(super) const NO_FILES: &str = "No assemblies files found in directory";

/// The conflict listing: one block per simple name with its versions and who wants them.
pub fn lines(result: &AnalysisResult, options: &VisualizerOptions) -> Vec<Line> {
    let mut lines = Vec::new();
    if result.analyzed_files().is_empty() {
        lines.push(Line::plain(NO_FILES));
        return lines;
    }

    if options.only_conflicts {
        lines.push(Line::plain(
            "Detailing only conflicting assembly references.",
        ));
    }

    for group in name_groups(result) {
        if options.only_conflicts && is_single_local(&group) {
            continue;
        }

        let name = group[0].effective_identity().name.clone();
        lines.push(Line::colored("Reference: ", Color::White).push(name, group_color(&group)));
        for node in &group {
            member_lines(result, node, &mut lines);
        }
        lines.push(Line::plain(""));
    }

    lines
}

fn group_color(group: &[&AssemblyNode]) -> Color {
    let any = |source: AssemblySource| group.iter().any(|node| node.source() == source);

    if any(AssemblySource::Unknown) {
        Color::Magenta
    } else if group.iter().any(|node| node.has_alternative_version()) {
        Color::DarkYellow
    } else if any(AssemblySource::NotFound) {
        Color::Red
    } else if any(AssemblySource::GlobalCache) {
        Color::Yellow
    } else if group.iter().any(|node| node.is_redirected()) {
        Color::DarkGreen
    } else {
        Color::Green
    }
}

pub(super) fn member_lines(result: &AnalysisResult, node: &AssemblyNode, lines: &mut Vec<Line>) {
    let status = Color::for_source(node.source(), node.has_alternative_version());
    let shown = result
        .alternative_version(node.id())
        .map_or_else(|| node.effective_identity(), AssemblyNode::effective_identity);

    lines.push(Line::colored(format!("  {}", shown.display_name()), status));

    let source = match node.location() {
        Some(location) => format!(
            "  Source: {}, Location: {}",
            node.source(),
            location.display()
        ),
        None if node.has_alternative_version() => {
            format!("  Source: {}, alternative version found", node.source())
        }
        None => format!("  Source: {}", node.source()),
    };
    lines.push(Line::colored(source, status));

    let mut referers: Vec<String> = result
        .referenced_by(node.id())
        .map(|referer| referer.effective_identity().display_name())
        .collect();
    referers.sort();

    for referer in referers {
        lines.push(
            Line::colored(format!("    {}", node.identity().version), status)
                .push(" by ", Color::White)
                .push(referer, Color::Gray),
        );
    }
}
