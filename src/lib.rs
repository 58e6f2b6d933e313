// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotdeps
//!
//! Dependency analysis for .NET assemblies. `dotdeps` reads the assembly manifests of every
//! managed binary in a build output folder, builds the graph of who references whom,
//! resolves references that no local file provides, and tells you which versions are in
//! conflict or missing. Nothing is loaded into a runtime and nothing is executed; the
//! manifests are read straight from the PE images.
//!
//! ## Features
//!
//! - **Manifest reader** - `Assembly` and `AssemblyRef` rows from ECMA-335 metadata, PE32 and PE32+
//! - **Cheap sniffing** - one page read decides whether a file is a managed binary
//! - **Global cache probing** - Mono and .NET Framework GAC layouts, plus search directories
//! - **Binding redirects** - `app.config` `<assemblyBinding>` sections read and written
//! - **Alternative versions** - a missing version borrows the closest resolved one
//! - **Deterministic** - parallel loading, sorted reporting, identical graphs on every run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotdeps::prelude::*;
//! use std::sync::Arc;
//!
//! let files: Vec<std::path::PathBuf> = std::fs::read_dir("bin")?
//!     .filter_map(|entry| entry.ok().map(|entry| entry.path()))
//!     .collect();
//!
//! let result = DependencyAnalyzer::new(files)
//!     .with_loader(Arc::new(PeMetadataLoader::new().with_default_locations()))
//!     .analyze(&LogSink);
//!
//! for node in result.assemblies() {
//!     println!("{} ({})", node.effective_identity(), node.source());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`sniffer`] - first-page PE check
//! - [`metadata`] - CLI header, metadata root, heaps and the manifest tables
//! - [`loader`] - the [`loader::MetadataLoader`] seam and its PE implementation
//! - [`identity`] - assembly identities, versions and public key tokens
//! - [`classify`] - platform heuristics and node provenance
//! - [`redirect`] - version redirect policies
//! - [`graph`] - the node arena, edges and traversal
//! - [`analyzer`] and [`result`] - the four-pass analysis and its output
//! - [`diagnostics`] - where progress, warnings and errors go
//! - [`builder`] - synthetic managed images for tests and fixtures

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use dotdeps::prelude::*;
///
/// let result = DependencyAnalyzer::new(vec!["bin/App.dll".into()]).analyze(&LogSink);
/// println!("{} assemblies", result.len());
/// ```
pub mod prelude;

/// First-page check for managed PE images.
///
/// Reading a whole file to find out it is a native DLL or a text file is wasteful. The
/// sniffer reads the first 4 KiB, follows the PE headers and checks that the CLR runtime
/// header directory is present. It never fails; anything unreadable is "not loadable".
pub mod sniffer;

/// ECMA-335 metadata, limited to what describes an assembly's identity and references.
///
/// # Key Components
///
/// - [`metadata::AssemblyManifest`] - declared identity plus referenced identities
/// - [`metadata::cor20header`] - CLI header
/// - [`metadata::root`] - metadata root and stream directory
/// - [`metadata::streams`] - `#Strings`, `#Blob` and the table stream
/// - [`metadata::tables`] - row layouts and the `Assembly`/`AssemblyRef` rows
pub mod metadata;

/// Assembly identities.
pub mod identity;

/// Provenance classification and the platform heuristic.
pub mod classify;

/// Loading assembly metadata from files and by identity.
pub mod loader;

/// Version redirect policies and `app.config` binding redirects.
pub mod redirect;

/// The assembly reference graph.
pub mod graph;

/// The four-pass dependency analysis.
pub mod analyzer;

/// The read-only result of an analysis.
pub mod result;

/// Diagnostics and the sinks that receive them.
pub mod diagnostics;

/// Synthetic managed PE images.
pub mod builder;

/// `dotdeps` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
///
/// # Example
///
/// ```rust,no_run
/// use dotdeps::{metadata::AssemblyManifest, Result};
///
/// fn reference_count(path: &std::path::Path) -> Result<usize> {
///     Ok(AssemblyManifest::from_file(path)?.references.len())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotdeps` Error type
///
/// See [`Error`] for the variants. The analyzer itself does not return errors; only
/// configuration loading and direct use of the loader and metadata reader do.
///
/// # Example
///
/// ```rust,no_run
/// use dotdeps::{redirect::BindingRedirects, Error};
///
/// match BindingRedirects::from_config(std::path::Path::new("App.config")) {
///     Ok(redirects) => println!("{} redirects", redirects.len()),
///     Err(Error::ConfigurationNotFound(path)) => println!("missing {}", path.display()),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Memory-mapped or in-memory PE file, as consumed by [`metadata::AssemblyManifest::read`].
pub use file::File;

pub use analyzer::{AnalysisOptions, DependencyAnalyzer};
pub use result::AnalysisResult;
