//! Diagnostics reported during analysis.
//!
//! The analyzer never fails on a single bad input: unreadable files, unresolvable
//! references and a missing root file are reported to a [`DiagnosticSink`] and the run
//! continues. Two sinks are provided:
//!
//! - [`Diagnostics`] collects entries in a lock-free `boxcar::Vec` for later inspection
//! - [`LogSink`] forwards entries to the `log` facade under the `dotdeps` target
//!
//! # Examples
//!
//! ```rust
//! use dotdeps::diagnostics::{DiagnosticCategory, DiagnosticSink, Diagnostics};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.warning(DiagnosticCategory::Resolution, "Could not load Lib");
//!
//! assert!(diagnostics.has_warnings());
//! assert_eq!(diagnostics.warning_count(), 1);
//! ```

use std::fmt::{self, Write};

/// Log target used by [`LogSink`].
pub const LOG_TARGET: &str = "dotdeps";

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// Progress information.
    Info,
    /// A reference could not be resolved; the analysis is still complete.
    Warning,
    /// An input was skipped or a request could not be honored.
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Info => write!(f, "INFO"),
            DiagnosticSeverity::Warning => write!(f, "WARN"),
            DiagnosticSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// The analysis step a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    /// Loading the input files.
    Discovery,
    /// Reading the references of loaded assemblies.
    Reference,
    /// Loading referenced assemblies by identity.
    Resolution,
    /// Locating the root file.
    Root,
    /// Writing results.
    Export,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Discovery => write!(f, "Discovery"),
            DiagnosticCategory::Reference => write!(f, "Reference"),
            DiagnosticCategory::Resolution => write!(f, "Resolution"),
            DiagnosticCategory::Root => write!(f, "Root"),
            DiagnosticCategory::Export => write!(f, "Export"),
        }
    }
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: DiagnosticSeverity,
    /// Originating step
    pub category: DiagnosticCategory,
    /// Human-readable message
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic.
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)
    }
}

/// Receiver of diagnostics.
///
/// Sinks are shared across threads, so [`DiagnosticSink::report`] takes `&self`.
pub trait DiagnosticSink: Send + Sync {
    /// Receives one diagnostic.
    fn report(&self, diagnostic: Diagnostic);

    /// Reports an informational message.
    fn info(&self, category: DiagnosticCategory, message: &str) {
        self.report(Diagnostic::new(DiagnosticSeverity::Info, category, message));
    }

    /// Reports a warning.
    fn warning(&self, category: DiagnosticCategory, message: &str) {
        self.report(Diagnostic::new(
            DiagnosticSeverity::Warning,
            category,
            message,
        ));
    }

    /// Reports an error.
    fn error(&self, category: DiagnosticCategory, message: &str) {
        self.report(Diagnostic::new(
            DiagnosticSeverity::Error,
            category,
            message,
        ));
    }
}

/// A thread-safe collection of diagnostics.
#[derive(Debug)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Appends a diagnostic.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Returns `true` if anything was reported.
    pub fn has_any(&self) -> bool {
        self.entries.count() > 0
    }

    /// Returns `true` if an error was reported.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns `true` if a warning was reported.
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Warning)
    }

    /// Total number of diagnostics.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Number of errors.
    pub fn error_count(&self) -> usize {
        self.count_of(DiagnosticSeverity::Error)
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.count_of(DiagnosticSeverity::Warning)
    }

    /// Number of informational messages.
    pub fn info_count(&self) -> usize {
        self.count_of(DiagnosticSeverity::Info)
    }

    fn count_of(&self, severity: DiagnosticSeverity) -> usize {
        self.entries
            .iter()
            .filter(|(_, d)| d.severity == severity)
            .count()
    }

    /// All diagnostics in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// All errors in report order.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.with_severity(DiagnosticSeverity::Error)
    }

    /// All warnings in report order.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.with_severity(DiagnosticSeverity::Warning)
    }

    fn with_severity(&self, severity: DiagnosticSeverity) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.severity == severity).collect()
    }

    /// All diagnostics of `category` in report order.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category == category).collect()
    }

    /// Messages in report order, without severity or category.
    pub fn messages(&self) -> Vec<&str> {
        self.iter().map(|d| d.message.as_str()).collect()
    }

    /// Counts followed by every error and warning.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let error_count = self.error_count();
        let warning_count = self.warning_count();
        let info_count = self.info_count();

        let _ = writeln!(
            output,
            "Diagnostics: {} error(s), {} warning(s), {} info(s)",
            error_count, warning_count, info_count
        );

        if error_count > 0 {
            output.push_str("\nErrors:\n");
            for diag in self.errors() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        if warning_count > 0 {
            output.push_str("\nWarnings:\n");
            for diag in self.warnings() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        output
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Forwards diagnostics to the `log` facade.
///
/// Info maps to `log::info!`, warnings to `log::warn!` and errors to `log::error!`, all
/// under the [`LOG_TARGET`] target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Info => log::info!(target: LOG_TARGET, "{}", diagnostic.message),
            DiagnosticSeverity::Warning => {
                log::warn!(target: LOG_TARGET, "{}", diagnostic.message);
            }
            DiagnosticSeverity::Error => {
                log::error!(target: LOG_TARGET, "{}", diagnostic.message);
            }
        }
    }
}
