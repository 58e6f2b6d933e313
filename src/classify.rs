//! Provenance classification.
//!
//! Two independent questions are answered here: whether an identity probably belongs to
//! the platform rather than the application ([`is_system_identity`]), and where a graph
//! node's metadata came from ([`AssemblySource`]).

use std::fmt;

use crate::identity::{AssemblyIdentity, PublicKeyToken};

/// The token of the ECMA and Microsoft platform signing key, `b77a5c561934e089`.
pub const PLATFORM_PUBLIC_KEY_TOKEN: PublicKeyToken =
    PublicKeyToken::new([0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]);

const SYSTEM_NAME_PREFIXES: [&str; 4] = ["System.", "mscorlib", "Microsoft.", "netstandard"];

/// Returns `true` if `identity` looks like a platform assembly.
///
/// That is the case when it is signed with [`PLATFORM_PUBLIC_KEY_TOKEN`] or its simple
/// name starts with `System.`, `mscorlib`, `Microsoft.` or `netstandard`, ignoring case.
/// This is a heuristic for filtering output, not a trust decision.
#[must_use]
pub fn is_system_identity(identity: &AssemblyIdentity) -> bool {
    if identity.public_key_token == Some(PLATFORM_PUBLIC_KEY_TOKEN) {
        return true;
    }

    SYSTEM_NAME_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(&identity.name, prefix))
}

/// Case-insensitive (ASCII) prefix test.
#[must_use]
pub fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

/// Where a node's metadata was obtained.
///
/// A node starts out in the state its first resolution attempt produces and never moves
/// to another state afterwards. The only later change is attaching an alternative version
/// to a `NotFound` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssemblySource {
    /// Loaded from one of the analyzed files.
    Local,
    /// Loaded by identity from a platform-wide assembly cache.
    GlobalCache,
    /// Loaded by identity from somewhere else, such as a search directory.
    Unknown,
    /// Could not be loaded.
    NotFound,
}

impl AssemblySource {
    /// Returns `true` unless the source is [`AssemblySource::NotFound`].
    #[must_use]
    pub fn is_resolved(self) -> bool {
        self != AssemblySource::NotFound
    }
}

impl fmt::Display for AssemblySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssemblySource::Local => "Local",
            AssemblySource::GlobalCache => "GlobalCache",
            AssemblySource::Unknown => "Unknown",
            AssemblySource::NotFound => "NotFound",
        })
    }
}
