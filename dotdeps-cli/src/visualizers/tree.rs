use dotdeps::{classify::AssemblySource, graph::NodeId, AnalysisResult};

use super::VisualizerOptions;
use crate::console::{Color, Line};

const TAB: &str = "    ";
const NODE: &str = "├──";
const END_NODE: &str = "└──";
const CONTINUATION: &str = "│  ";

struct Frame {
    id: NodeId,
    tab: String,
    last: bool,
    depth: usize,
}

/// The dependency tree below every root.
///
/// A missing node with an alternative version shows the alternative's references. A node
/// already on the current path is printed but not expanded again.
pub fn lines(result: &AnalysisResult, options: &VisualizerOptions) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut path: Vec<NodeId> = Vec::new();
    let mut stack: Vec<Frame> = result
        .roots()
        .iter()
        .rev()
        .map(|&id| Frame {
            id,
            tab: String::new(),
            last: true,
            depth: 0,
        })
        .collect();

    while let Some(frame) = stack.pop() {
        path.truncate(frame.depth);

        let node = result.node(frame.id);
        let alternative = result.alternative_version(frame.id);
        let identity = node.effective_identity();
        let mut text = format!("{} {}", identity.name, identity.version);
        if let Some(alternative) = alternative {
            text.push_str(&format!(
                " -> {}",
                alternative.effective_identity().version
            ));
        }

        let label = if frame.last { END_NODE } else { NODE };
        lines.push(Line::plain(format!("{}{label}", frame.tab)).push(
            text,
            Color::for_source(node.source(), false),
        ));

        if path.contains(&frame.id) {
            continue;
        }
        path.push(frame.id);

        let expanded = alternative.map_or(frame.id, |alternative| alternative.id());
        if expanded != frame.id {
            path.push(expanded);
        }

        let children: Vec<NodeId> = result
            .references(expanded)
            .filter(|child| !(options.skip_system && child.source() == AssemblySource::GlobalCache))
            .map(|child| child.id())
            .collect();

        let tab = format!(
            "{}{}",
            frame.tab,
            if frame.last { TAB } else { CONTINUATION }
        );
        let count = children.len();
        for (i, child) in children.into_iter().enumerate().rev() {
            stack.push(Frame {
                id: child,
                tab: tab.clone(),
                last: i + 1 == count,
                depth: path.len(),
            });
        }
    }

    lines
}
