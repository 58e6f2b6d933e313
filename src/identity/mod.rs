//! Assembly identities.
//!
//! An identity is the tuple (simple name, version, culture, public-key token) that names a
//! managed binary, in the form used by ECMA-335 `Assembly` and `AssemblyRef` rows and by
//! .NET display names:
//!
//! ```text
//! Newtonsoft.Json, Version=13.0.0.0, Culture=neutral, PublicKeyToken=30ad4fe6b2a6aeed
//! ```
//!
//! # Key Components
//!
//! - [`AssemblyIdentity`] - name, version, culture and token, with display-name parsing
//! - [`AssemblyVersion`] - four-part version with ordering and "closest version" ranking
//! - [`PublicKeyToken`] - 8-byte token, derivable from a full public key
//!
//! # Examples
//!
//! ```rust
//! use dotdeps::identity::{AssemblyIdentity, AssemblyVersion};
//!
//! let mscorlib = AssemblyIdentity::parse(
//!     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
//! )?;
//! assert_eq!(mscorlib.version, AssemblyVersion::new(4, 0, 0, 0));
//! assert_eq!(
//!     mscorlib.public_key_token.map(|t| t.to_string()).as_deref(),
//!     Some("b77a5c561934e089")
//! );
//! # Ok::<(), dotdeps::Error>(())
//! ```

mod assembly;

pub use assembly::{AssemblyIdentity, AssemblyVersion};

use std::{fmt, str::FromStr};

use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// The 8-byte public-key token of a strong-named assembly.
///
/// Bytes are kept in display order: `b77a5c561934e089` is
/// `[0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKeyToken([u8; 8]);

impl PublicKeyToken {
    /// Wraps raw token bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Interprets `bytes` as a token if it is exactly 8 bytes long.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 8]>::try_from(bytes).ok().map(Self)
    }

    /// Derives the token of a full public key: the last 8 bytes of its SHA-1 hash,
    /// in reverse order (ECMA-335 II.6.2.1.3).
    #[must_use]
    pub fn from_public_key(key: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(key);
        let hash = hasher.finalize();

        let mut token = [0_u8; 8];
        for (slot, byte) in token.iter_mut().zip(hash.iter().rev()) {
            *slot = *byte;
        }
        Self(token)
    }

    /// Parses 16 hexadecimal digits.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for non-hex input or the wrong length.
    pub fn parse(value: &str) -> Result<Self> {
        let bytes = hex::decode(value)
            .map_err(|e| malformed_error!("Invalid hex in PublicKeyToken '{}': {}", value, e))?;

        Self::from_slice(&bytes).ok_or_else(|| {
            malformed_error!(
                "PublicKeyToken must be exactly 8 bytes (16 hex characters), got {} bytes from '{}'",
                bytes.len(),
                value
            )
        })
    }

    /// Token bytes in display order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for PublicKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for PublicKeyToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The ECMA standard public key; its token is the well-known b77a5c561934e089.
    const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn token_from_ecma_key() {
        let token = PublicKeyToken::from_public_key(&ECMA_KEY);
        assert_eq!(token.to_string(), "b77a5c561934e089");
    }

    #[test]
    fn token_parse_and_display() {
        let token = PublicKeyToken::parse("31bf3856ad364e35").unwrap();
        assert_eq!(
            token.as_bytes(),
            &[0x31, 0xbf, 0x38, 0x56, 0xad, 0x36, 0x4e, 0x35]
        );
        assert_eq!(token.to_string(), "31bf3856ad364e35");
        assert_eq!("31BF3856AD364E35".parse::<PublicKeyToken>().unwrap(), token);
    }

    #[test]
    fn token_parse_errors() {
        assert!(PublicKeyToken::parse("zz").is_err());
        assert!(PublicKeyToken::parse("31bf3856").is_err());
        assert!(PublicKeyToken::from_slice(&[1, 2, 3]).is_none());
    }
}
