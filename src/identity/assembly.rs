//! Assembly identity and version types.

use std::{fmt, fmt::Write, str::FromStr};

use crate::{identity::PublicKeyToken, Error, Result};

/// Identity of an assembly as declared by its own `Assembly` row or by a referencing
/// `AssemblyRef` row.
///
/// Two identities are equal when name, version, culture and token are all equal. Name
/// comparison here is exact; graph keys built with [`AssemblyIdentity::key`] fold case.
///
/// # Examples
///
/// ```rust
/// use dotdeps::identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken};
///
/// let identity = AssemblyIdentity::new("Contoso.Core", AssemblyVersion::new(2, 1, 0, 0))
///     .with_public_key_token(PublicKeyToken::new([1, 2, 3, 4, 5, 6, 7, 8]));
/// assert_eq!(
///     identity.display_name(),
///     "Contoso.Core, Version=2.1.0.0, Culture=neutral, PublicKeyToken=0102030405060708"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple name, e.g. `System.Runtime`.
    pub name: String,

    /// Four-part version.
    pub version: AssemblyVersion,

    /// Culture name; `None` means neutral.
    pub culture: Option<String>,

    /// Public-key token; `None` for assemblies without a strong name.
    pub public_key_token: Option<PublicKeyToken>,
}

/// Four-part assembly version `major.minor.build.revision`.
///
/// Ordering is component-wise, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version number
    pub major: u16,
    /// Minor version number
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyIdentity {
    /// Creates a culture-neutral identity without a token.
    pub fn new(name: impl Into<String>, version: AssemblyVersion) -> Self {
        Self {
            name: name.into(),
            version,
            culture: None,
            public_key_token: None,
        }
    }

    /// Sets the culture. `""` and `"neutral"` (any case) mean culture-neutral.
    #[must_use]
    pub fn with_culture(mut self, culture: &str) -> Self {
        self.culture = normalize_culture(culture);
        self
    }

    /// Sets the public-key token.
    #[must_use]
    pub fn with_public_key_token(mut self, token: PublicKeyToken) -> Self {
        self.public_key_token = Some(token);
        self
    }

    /// Parses a .NET display name such as
    /// `"Name, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"`.
    ///
    /// Keys are matched case-insensitively; unknown keys (`ProcessorArchitecture`,
    /// `Retargetable`, ...) are ignored. Missing components default to version
    /// `0.0.0.0`, neutral culture and no token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty name, a bad version or a bad
    /// token.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut identity = Self::new(name, AssemblyVersion::default());
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "version" => identity.version = AssemblyVersion::parse(value)?,
                "culture" => identity.culture = normalize_culture(value),
                "publickeytoken" => {
                    if !value.is_empty() && !value.eq_ignore_ascii_case("null") {
                        identity.public_key_token = Some(PublicKeyToken::parse(value)?);
                    }
                }
                _ => {}
            }
        }

        Ok(identity)
    }

    /// The full display name, e.g.
    /// `"Name, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);
        result.push_str(&self.name);

        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );

        result.push_str(", PublicKeyToken=");
        match &self.public_key_token {
            Some(token) => {
                let _ = write!(result, "{token}");
            }
            None => result.push_str("null"),
        }

        result
    }

    /// Case-folded display name. At most one graph node exists per key.
    #[must_use]
    pub fn key(&self) -> String {
        self.display_name().to_lowercase()
    }

    /// Returns `true` if `other` has the same simple name, ignoring case.
    #[must_use]
    pub fn same_name(&self, other: &AssemblyIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }

    /// Returns `true` if this identity has no culture.
    #[must_use]
    pub fn is_culture_neutral(&self) -> bool {
        self.culture.is_none()
    }

    /// Returns `true` if this identity carries a public-key token.
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.public_key_token.is_some()
    }

    /// Returns `true` if a binary declaring `self` can serve a request for `required`.
    ///
    /// Names must match ignoring case, cultures must match, tokens must match when the
    /// request carries one, and the version must be at least the requested version.
    #[must_use]
    pub fn satisfies(&self, required: &AssemblyIdentity) -> bool {
        let culture_matches = match (&self.culture, &required.culture) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };

        let token_matches = match required.public_key_token {
            Some(token) => self.public_key_token == Some(token),
            None => true,
        };

        self.same_name(required)
            && culture_matches
            && token_matches
            && self.version >= required.version
    }
}

fn normalize_culture(culture: &str) -> Option<String> {
    let culture = culture.trim();
    if culture.is_empty() || culture.eq_ignore_ascii_case("neutral") {
        None
    } else {
        Some(culture.to_string())
    }
}

impl AssemblyVersion {
    /// Creates a version from its four components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Returns `true` if `self` is a better stand-in than `other` for `target`.
    ///
    /// A version sharing the target's major wins over one that does not. Between two
    /// that share it, the higher wins. Between two that do not, the smaller major
    /// distance wins. Equal candidates return `false`.
    #[must_use]
    pub fn is_closer_to(&self, other: &AssemblyVersion, target: &AssemblyVersion) -> bool {
        let self_same_major = self.major == target.major;
        let other_same_major = other.major == target.major;

        match (self_same_major, other_same_major) {
            (true, false) => true,
            (false, true) => false,
            (true, true) => self > other,
            (false, false) => {
                let self_dist = self.major.abs_diff(target.major);
                let other_dist = other.major.abs_diff(target.major);
                self_dist < other_dist || (self_dist == other_dist && self > other)
            }
        }
    }

    /// Parses `"major[.minor[.build[.revision]]]"`; missing components are zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for more than four components or a component
    /// that is not a `u16`.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.trim().split('.').collect();

        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0_u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .trim()
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_version_parse() {
        assert_eq!(
            AssemblyVersion::parse("1.2.3.4").unwrap(),
            AssemblyVersion::new(1, 2, 3, 4)
        );
        assert_eq!(
            AssemblyVersion::parse("13.0").unwrap(),
            AssemblyVersion::new(13, 0, 0, 0)
        );
        assert!(AssemblyVersion::parse("1.2.3.4.5").is_err());
        assert!(AssemblyVersion::parse("1.x").is_err());
        assert!(AssemblyVersion::parse("70000").is_err());
    }

    #[test]
    fn test_assembly_version_ordering() {
        let v1 = AssemblyVersion::new(1, 0, 0, 0);
        let v2 = AssemblyVersion::new(1, 0, 0, 1);
        let v3 = AssemblyVersion::new(2, 0, 0, 0);
        assert!(v1 < v2 && v2 < v3);
    }

    #[test]
    fn test_assembly_version_is_closer_to() {
        let target = AssemblyVersion::new(2, 0, 0, 0);
        let same_major_low = AssemblyVersion::new(2, 1, 0, 0);
        let same_major_high = AssemblyVersion::new(2, 5, 0, 0);
        let next_major = AssemblyVersion::new(3, 0, 0, 0);
        let far_major = AssemblyVersion::new(9, 0, 0, 0);

        assert!(same_major_low.is_closer_to(&next_major, &target));
        assert!(!next_major.is_closer_to(&same_major_low, &target));
        assert!(same_major_high.is_closer_to(&same_major_low, &target));
        assert!(next_major.is_closer_to(&far_major, &target));
        assert!(!next_major.is_closer_to(&next_major, &target));

        // Equal distance on both sides: the higher one wins
        let below = AssemblyVersion::new(1, 0, 0, 0);
        assert!(next_major.is_closer_to(&below, &target));
        assert!(!below.is_closer_to(&next_major, &target));
    }

    #[test]
    fn test_assembly_identity_display_name() {
        let identity = AssemblyIdentity::new("Lib", AssemblyVersion::new(1, 0, 0, 0));
        assert_eq!(
            identity.display_name(),
            "Lib, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"
        );

        let identity = identity
            .with_culture("de-DE")
            .with_public_key_token(PublicKeyToken::new([0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]));
        assert_eq!(
            identity.to_string(),
            "Lib, Version=1.0.0.0, Culture=de-DE, PublicKeyToken=b77a5c561934e089"
        );
    }

    #[test]
    fn test_assembly_identity_parse() {
        let identity = AssemblyIdentity::parse(
            "System.Runtime, Version=8.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a, ProcessorArchitecture=MSIL",
        )
        .unwrap();
        assert_eq!(identity.name, "System.Runtime");
        assert_eq!(identity.version, AssemblyVersion::new(8, 0, 0, 0));
        assert!(identity.is_culture_neutral());
        assert_eq!(
            identity.public_key_token.unwrap().to_string(),
            "b03f5f7f11d50a3a"
        );

        let bare = AssemblyIdentity::parse("Bare").unwrap();
        assert_eq!(bare.version, AssemblyVersion::default());
        assert!(!bare.is_strong_named());

        let lowercase = AssemblyIdentity::parse("Lib, version=1.2, culture=NEUTRAL, publickeytoken=NULL")
            .unwrap();
        assert_eq!(lowercase.version, AssemblyVersion::new(1, 2, 0, 0));
        assert!(lowercase.is_culture_neutral());
        assert!(!lowercase.is_strong_named());

        assert!(AssemblyIdentity::parse("").is_err());
        assert!(AssemblyIdentity::parse(", Version=1.0").is_err());
        assert!(AssemblyIdentity::parse("Lib, PublicKeyToken=123").is_err());
    }

    #[test]
    fn test_assembly_identity_display_parse_agree() {
        let original = AssemblyIdentity::new("Contoso.Data", AssemblyVersion::new(3, 1, 4, 1))
            .with_culture("fr")
            .with_public_key_token(PublicKeyToken::new([9; 8]));
        let parsed: AssemblyIdentity = original.display_name().parse().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_assembly_identity_key_folds_case() {
        let a = AssemblyIdentity::new("Contoso.Core", AssemblyVersion::new(1, 0, 0, 0));
        let b = AssemblyIdentity::new("CONTOSO.CORE", AssemblyVersion::new(1, 0, 0, 0));
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());
        assert!(a.same_name(&b));
    }

    #[test]
    fn test_assembly_identity_satisfies() {
        let token = PublicKeyToken::new([1; 8]);
        let required = AssemblyIdentity::new("Lib", AssemblyVersion::new(2, 0, 0, 0))
            .with_public_key_token(token);

        let exact = required.clone();
        assert!(exact.satisfies(&required));

        let newer = AssemblyIdentity::new("lib", AssemblyVersion::new(2, 1, 0, 0))
            .with_public_key_token(token);
        assert!(newer.satisfies(&required));

        let older = AssemblyIdentity::new("Lib", AssemblyVersion::new(1, 9, 0, 0))
            .with_public_key_token(token);
        assert!(!older.satisfies(&required));

        let unsigned = AssemblyIdentity::new("Lib", AssemblyVersion::new(2, 0, 0, 0));
        assert!(!unsigned.satisfies(&required));
        assert!(required.satisfies(&unsigned));

        let localized = exact.clone().with_culture("ja");
        assert!(!localized.satisfies(&required));
    }
}
