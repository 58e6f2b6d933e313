//! # dotdeps Prelude
//!
//! The types needed to run an analysis and read its result, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotdeps operations
pub use crate::Error;

/// The result type used throughout dotdeps
pub use crate::Result;

// ================================================================================================
// Analysis
// ================================================================================================

/// Entry point and its options
pub use crate::analyzer::{AnalysisOptions, DependencyAnalyzer};

/// Analysis output
pub use crate::result::AnalysisResult;

/// Graph types
pub use crate::graph::{AssemblyNode, NodeId, Resolution};

// ================================================================================================
// Identities and Provenance
// ================================================================================================

/// Assembly identity model
pub use crate::identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken};

/// Node provenance and platform heuristic
pub use crate::classify::{is_system_identity, AssemblySource};

// ================================================================================================
// Collaborators
// ================================================================================================

/// Metadata loading
pub use crate::loader::{AssemblyMetadata, MetadataLoader, PeMetadataLoader};

/// Version redirection
pub use crate::redirect::{BindingRedirects, NoRedirect, RedirectPolicy};

/// Diagnostics
pub use crate::diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticSeverity, DiagnosticSink, Diagnostics, LogSink,
};
