use dotdeps::{graph::AssemblyNode, AnalysisResult};

use super::console::{member_lines, NO_FILES};
use crate::console::Line;

/// Input files that no analyzed assembly references, in display-name order.
pub fn lines(result: &AnalysisResult) -> Vec<Line> {
    if result.analyzed_files().is_empty() {
        return vec![Line::plain(NO_FILES)];
    }

    let mut unreferenced: Vec<&AssemblyNode> = result
        .assemblies()
        .filter(|node| node.origin_file_name().is_some() && node.referenced_by_count() == 0)
        .collect();
    unreferenced.sort_by_key(|node| node.effective_identity().display_name());

    let mut lines = vec![Line::plain("Unreferenced Assemblies From Initial Files")];
    for node in unreferenced {
        member_lines(result, node, &mut lines);
        lines.push(Line::plain(""));
    }
    lines
}
