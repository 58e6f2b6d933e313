use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use dotdeps::{graph::AssemblyNode, AnalysisResult};
use serde::Serialize;

/// Print `data` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{json}");
    Ok(())
}

/// Machine-readable summary of one analysis.
#[derive(Debug, Serialize)]
pub struct AnalysisSummary {
    pub files: Vec<String>,
    pub roots: Vec<String>,
    pub assemblies: Vec<AssemblySummary>,
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AssemblySummary {
    pub name: String,
    pub version: String,
    pub full_name: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_version: Option<String>,
    pub redirected: bool,
    pub reachable: bool,
    pub references: Vec<String>,
    pub referenced_by: Vec<String>,
}

impl AnalysisSummary {
    pub fn new(result: &AnalysisResult) -> Self {
        let assemblies = result
            .assemblies()
            .map(|node| {
                let identity = node.effective_identity();
                AssemblySummary {
                    name: identity.name.clone(),
                    version: identity.version.to_string(),
                    full_name: identity.display_name(),
                    source: node.source().to_string(),
                    location: node.location().map(|path| path.display().to_string()),
                    origin_file: node.origin_file_name().map(str::to_string),
                    alternative_version: result
                        .alternative_version(node.id())
                        .map(|alternative| alternative.effective_identity().version.to_string()),
                    redirected: node.is_redirected(),
                    reachable: node.reachable_from_root(),
                    references: full_names(result.references(node.id())),
                    referenced_by: full_names(result.referenced_by(node.id())),
                }
            })
            .collect();

        AnalysisSummary {
            files: result
                .analyzed_files()
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            roots: full_names(result.root_nodes()),
            assemblies,
            missing: full_names(result.missing_assemblies().into_iter()),
        }
    }
}

fn full_names<'a>(nodes: impl Iterator<Item = &'a AssemblyNode>) -> Vec<String> {
    let mut names: Vec<String> = nodes
        .map(|node| node.effective_identity().display_name())
        .collect();
    names.sort();
    names
}

/// Column alignment for tabular output.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

/// Tabular writer backed by `comfy-table`.
///
/// Columns are sized to the widest entry, without borders or separators.
pub struct TabWriter {
    table: Table,
    indent: String,
}

impl TabWriter {
    /// Each column is a `(header, alignment)` pair.
    pub fn new(columns: Vec<(&str, Align)>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let headers: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        table.set_header(headers);

        // Outer columns get no outer padding, inner columns a 2-space gap.
        let last = columns.len().saturating_sub(1);
        for (i, (_, align)) in columns.iter().enumerate() {
            let cell_align = match align {
                Align::Left => CellAlignment::Left,
                Align::Right => CellAlignment::Right,
            };
            if let Some(col) = table.column_mut(i) {
                col.set_cell_alignment(cell_align);
                let pad_left = if i == 0 { 0 } else { 1 };
                let pad_right = if i == last { 0 } else { 1 };
                col.set_padding((pad_left, pad_right));
            }
        }

        Self {
            table,
            indent: String::new(),
        }
    }

    /// Set the indent prefix for every line.
    pub fn indent(mut self, prefix: &str) -> Self {
        self.indent = prefix.to_string();
        self
    }

    /// Add a row. Values are given in column order.
    pub fn row(&mut self, values: Vec<String>) {
        self.table.add_row(values);
    }

    /// Render the table, trimming trailing whitespace from each line.
    pub fn render(&self) -> Vec<String> {
        self.table
            .to_string()
            .lines()
            .map(|line| format!("{}{}", self.indent, line.trim_end()))
            .collect()
    }

    pub fn print(&self) {
        for line in self.render() {
            println!("{line}");
        }
    }
}

/// Table of the assemblies that could not be found and how many assemblies want them.
pub fn missing_table(result: &AnalysisResult) -> TabWriter {
    let mut table = TabWriter::new(vec![
        ("ASSEMBLY", Align::Left),
        ("REFERENCED BY", Align::Right),
    ])
    .indent("  ");

    let mut missing = result.missing_assemblies();
    missing.sort_by_key(|node| node.effective_identity().display_name());
    for node in missing {
        table.row(vec![
            node.effective_identity().display_name(),
            node.referenced_by_count().to_string(),
        ]);
    }
    table
}
