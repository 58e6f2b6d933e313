use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use dotdeps::diagnostics::{DiagnosticCategory, DiagnosticSink};

/// The candidate files of one run.
#[derive(Debug)]
pub struct Discovery {
    /// Directory that was searched.
    pub directory: PathBuf,
    /// `*.dll` and `*.exe` files, sorted by path.
    pub files: Vec<PathBuf>,
    /// File name of the root assembly when a file was given instead of a directory.
    pub root_file: Option<String>,
}

/// Collects the candidate files for `directory_or_file`.
///
/// A file argument searches its parent directory and names the root assembly.
pub fn discover(
    directory_or_file: &Path,
    include_sub: bool,
    sink: &dyn DiagnosticSink,
) -> anyhow::Result<Discovery> {
    let (directory, root_file) = if directory_or_file.is_file() {
        let root = file_display_name(directory_or_file);
        sink.info(
            DiagnosticCategory::Discovery,
            &format!("Root assembly specified: '{root}'"),
        );

        let parent = directory_or_file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        (parent, Some(root))
    } else if directory_or_file.is_dir() {
        (directory_or_file.to_path_buf(), None)
    } else {
        bail!(
            "Directory or file: '{}' does not exist.",
            directory_or_file.display()
        );
    };

    sink.info(
        DiagnosticCategory::Discovery,
        &format!(
            "Checking for local assemblies in: '{}', {}",
            directory.display(),
            if include_sub {
                "AllDirectories"
            } else {
                "TopDirectoryOnly"
            }
        ),
    );

    let files = collect_assemblies(&directory, include_sub)?;
    Ok(Discovery {
        directory,
        files,
        root_file,
    })
}

/// Collect all `.exe` and `.dll` files from a directory, optionally recursing.
///
/// Symlinked directories are not descended into, so a link back to an ancestor
/// cannot repeat the same files.
pub fn collect_assemblies(dir: &Path, recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_assemblies_recursive(dir, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_assemblies_recursive(
    dir: &Path,
    recursive: bool,
    files: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if recursive {
                collect_assemblies_recursive(&path, recursive, files)?;
            }
        } else if is_assembly_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Returns true if the path has an `.exe` or `.dll` extension, ignoring case.
pub fn is_assembly_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("exe") || e.eq_ignore_ascii_case("dll"))
}

/// Extract a display-friendly filename from a path.
pub fn file_display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
