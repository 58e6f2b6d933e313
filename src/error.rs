use std::path::PathBuf;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every failure this library can report.
///
/// Most variants describe why a single binary could not be read. The analyzer never
/// lets those escape: a file that fails to load is logged and skipped. The variants
/// that do reach callers of [`crate::DependencyAnalyzer`] are the configuration ones,
/// raised before any analysis starts.
///
/// # Error Categories
///
/// ## File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond file boundaries
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from the goblin crate
///
/// ## Resolution Errors
/// - [`Error::AssemblyNotFound`] - No candidate binary exists for an identity
/// - [`Error::AssemblyMismatch`] - A candidate exists but declares another identity
///
/// ## Configuration Errors
/// - [`Error::ConfigurationNotFound`] - A configuration file was named but is missing
/// - [`Error::Configuration`] - A configuration file could not be parsed
///
/// # Examples
///
/// ```rust,no_run
/// use dotdeps::{Error, loader::{MetadataLoader, PeMetadataLoader}};
/// use std::path::Path;
///
/// let loader = PeMetadataLoader::new();
/// match loader.load_file(Path::new("App.dll")) {
///     Ok(metadata) => println!("{}", metadata.identity),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// No binary providing the requested assembly could be located.
    ///
    /// This is the ordinary "not found" outcome of a load by identity. The analyzer
    /// answers it with an alternative-version lookup.
    #[error("Could not find assembly '{0}'")]
    AssemblyNotFound(String),

    /// A binary was located for the requested assembly, but it declares an identity
    /// that does not satisfy the request.
    #[error("Assembly '{requested}' resolved to '{found}' which does not match")]
    AssemblyMismatch {
        /// Display name that was requested
        requested: String,
        /// Display name declared by the located binary
        found: String,
    },

    /// A configuration file was specified but does not exist.
    #[error("Directory or file: '{}' does not exist.", .0.display())]
    ConfigurationNotFound(PathBuf),

    /// A configuration file exists but could not be understood.
    #[error("Invalid configuration - {0}")]
    Configuration(String),
}

impl Error {
    /// Returns `true` for the "not found" outcome of a load, as opposed to a hard
    /// failure such as a corrupt or mismatching binary.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::AssemblyNotFound(_))
    }
}
