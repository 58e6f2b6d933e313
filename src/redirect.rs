//! Version redirect policies.
//!
//! A [`RedirectPolicy`] maps the identity a binary asks for to the identity that will be
//! bound at run time. Graph nodes are keyed by the redirected (effective) identity, so
//! references that redirect to the same version collapse into one node.
//!
//! [`BindingRedirects`] reads the `<assemblyBinding>` section of an `app.config` or
//! `web.config` file and can render one back out:
//!
//! ```xml
//! <runtime>
//!   <assemblyBinding xmlns="urn:schemas-microsoft-com:asm.v1">
//!     <dependentAssembly>
//!       <assemblyIdentity name="Newtonsoft.Json" publicKeyToken="30ad4fe6b2a6aeed" culture="neutral" />
//!       <bindingRedirect oldVersion="0.0.0.0-13.0.0.0" newVersion="13.0.0.0" />
//!     </dependentAssembly>
//!   </assemblyBinding>
//! </runtime>
//! ```

use std::{borrow::Cow, fmt, fs, path::Path};

use log::debug;
use quick_xml::{
    events::{attributes::Attribute, BytesDecl, BytesEnd, BytesStart, Event},
    Reader, Writer,
};

use crate::{
    identity::{AssemblyIdentity, AssemblyVersion, PublicKeyToken},
    Error, Result,
};

/// Namespace of the `<assemblyBinding>` element.
pub const ASSEMBLY_BINDING_NAMESPACE: &str = "urn:schemas-microsoft-com:asm.v1";

/// Maps a requested identity to the identity bound at run time.
pub trait RedirectPolicy: Send + Sync {
    /// Returns the effective identity for `identity`.
    fn apply(&self, identity: &AssemblyIdentity) -> AssemblyIdentity;
}

/// The identity policy: nothing is redirected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRedirect;

impl RedirectPolicy for NoRedirect {
    fn apply(&self, identity: &AssemblyIdentity) -> AssemblyIdentity {
        identity.clone()
    }
}

/// An inclusive range of versions, written `low-high` or as a single version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    /// Lowest version in the range
    pub low: AssemblyVersion,
    /// Highest version in the range
    pub high: AssemblyVersion,
}

impl VersionRange {
    /// Creates a range; the bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn new(low: AssemblyVersion, high: AssemblyVersion) -> Self {
        if low <= high {
            Self { low, high }
        } else {
            Self {
                low: high,
                high: low,
            }
        }
    }

    /// Parses `"1.0.0.0-2.0.0.0"` or `"1.0.0.0"`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a bound is not a valid version.
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once('-') {
            Some((low, high)) => Ok(Self::new(
                AssemblyVersion::parse(low)?,
                AssemblyVersion::parse(high)?,
            )),
            None => {
                let version = AssemblyVersion::parse(value)?;
                Ok(Self::new(version, version))
            }
        }
    }

    /// Returns `true` if `version` lies within the range.
    #[must_use]
    pub fn contains(&self, version: &AssemblyVersion) -> bool {
        self.low <= *version && *version <= self.high
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// One `<dependentAssembly>` redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRedirect {
    /// Simple name, compared ignoring case.
    pub name: String,
    /// Token the request must carry; `None` matches any.
    pub public_key_token: Option<PublicKeyToken>,
    /// Culture the request must carry; `None` means neutral.
    pub culture: Option<String>,
    /// Requested versions that are redirected.
    pub old_version: VersionRange,
    /// Version bound instead.
    pub new_version: AssemblyVersion,
}

impl BindingRedirect {
    /// Returns `true` if this redirect rewrites `identity`.
    #[must_use]
    pub fn matches(&self, identity: &AssemblyIdentity) -> bool {
        let token_matches = match self.public_key_token {
            Some(token) => identity.public_key_token == Some(token),
            None => true,
        };

        let culture_matches = match (&self.culture, &identity.culture) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };

        self.name.eq_ignore_ascii_case(&identity.name)
            && token_matches
            && culture_matches
            && self.old_version.contains(&identity.version)
    }
}

/// Redirects from an application configuration file.
///
/// Entries are tried in document order; the first match wins.
///
/// # Examples
///
/// ```rust
/// use dotdeps::identity::{AssemblyIdentity, AssemblyVersion};
/// use dotdeps::redirect::{BindingRedirects, RedirectPolicy};
///
/// let config = r#"
/// <configuration>
///   <runtime>
///     <assemblyBinding xmlns="urn:schemas-microsoft-com:asm.v1">
///       <dependentAssembly>
///         <assemblyIdentity name="Lib" culture="neutral" />
///         <bindingRedirect oldVersion="0.0.0.0-2.0.0.0" newVersion="2.0.0.0" />
///       </dependentAssembly>
///     </assemblyBinding>
///   </runtime>
/// </configuration>"#;
///
/// let redirects = BindingRedirects::parse(config)?;
/// let requested = AssemblyIdentity::new("Lib", AssemblyVersion::new(1, 5, 0, 0));
/// assert_eq!(redirects.apply(&requested).version, AssemblyVersion::new(2, 0, 0, 0));
/// # Ok::<(), dotdeps::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingRedirects {
    entries: Vec<BindingRedirect>,
}

#[derive(Default)]
struct PendingDependentAssembly {
    name: Option<String>,
    public_key_token: Option<PublicKeyToken>,
    culture: Option<String>,
    redirects: Vec<(VersionRange, AssemblyVersion)>,
}

impl BindingRedirects {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the redirects of the configuration file at `path`.
    ///
    /// # Errors
    /// Returns [`Error::ConfigurationNotFound`] if `path` does not exist and
    /// [`Error::Configuration`] if it cannot be read or parsed.
    pub fn from_config(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigurationNotFound(path.to_path_buf()));
        }

        let text = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let redirects = Self::parse(&text)?;
        debug!(
            "Read {} binding redirect(s) from {}",
            redirects.len(),
            path.display()
        );
        Ok(redirects)
    }

    /// Parses configuration XML. Only `<dependentAssembly>` elements are looked at; they
    /// may appear anywhere in the document.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for malformed XML or invalid attribute values.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut pending: Option<PendingDependentAssembly> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"dependentAssembly" => {
                    pending = Some(PendingDependentAssembly::default());
                }
                Ok(Event::Start(e) | Event::Empty(e)) => {
                    let Some(current) = pending.as_mut() else {
                        continue;
                    };

                    match e.local_name().as_ref() {
                        b"assemblyIdentity" => read_assembly_identity(&e, current)?,
                        b"bindingRedirect" => read_binding_redirect(&e, current)?,
                        _ => {}
                    }
                }
                Ok(Event::End(e)) if e.local_name().as_ref() == b"dependentAssembly" => {
                    if let Some(done) = pending.take() {
                        push_dependent_assembly(&mut entries, done);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Configuration(format!(
                        "Invalid XML at position {}: {}",
                        reader.error_position(),
                        e
                    )))
                }
                Ok(_) => {}
            }
        }

        Ok(Self { entries })
    }

    /// Appends a redirect.
    pub fn push(&mut self, redirect: BindingRedirect) {
        self.entries.push(redirect);
    }

    /// The redirects in document order.
    #[must_use]
    pub fn entries(&self) -> &[BindingRedirect] {
        &self.entries
    }

    /// Number of redirects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no redirects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the redirects as a `<runtime>` configuration fragment.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the XML cannot be written.
    pub fn to_config_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let xml_error = |e: std::io::Error| Error::Configuration(e.to_string());

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("runtime")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(
                BytesStart::new("assemblyBinding")
                    .with_attributes([("xmlns", ASSEMBLY_BINDING_NAMESPACE)]),
            ))
            .map_err(xml_error)?;

        for entry in &self.entries {
            writer
                .write_event(Event::Start(BytesStart::new("dependentAssembly")))
                .map_err(xml_error)?;

            let mut identity = BytesStart::new("assemblyIdentity");
            identity.push_attribute(("name", entry.name.as_str()));
            let token = entry.public_key_token.map(|token| token.to_string());
            if let Some(token) = &token {
                identity.push_attribute(("publicKeyToken", token.as_str()));
            }
            identity.push_attribute(("culture", entry.culture.as_deref().unwrap_or("neutral")));
            writer
                .write_event(Event::Empty(identity))
                .map_err(xml_error)?;

            let old_version = entry.old_version.to_string();
            let new_version = entry.new_version.to_string();
            let redirect = BytesStart::new("bindingRedirect").with_attributes([
                ("oldVersion", old_version.as_str()),
                ("newVersion", new_version.as_str()),
            ]);
            writer
                .write_event(Event::Empty(redirect))
                .map_err(xml_error)?;

            writer
                .write_event(Event::End(BytesEnd::new("dependentAssembly")))
                .map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("assemblyBinding")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("runtime")))
            .map_err(xml_error)?;

        String::from_utf8(writer.into_inner()).map_err(|e| Error::Configuration(e.to_string()))
    }
}

impl RedirectPolicy for BindingRedirects {
    fn apply(&self, identity: &AssemblyIdentity) -> AssemblyIdentity {
        let Some(redirect) = self.entries.iter().find(|entry| entry.matches(identity)) else {
            return identity.clone();
        };

        debug!(
            "Redirecting {} to version {}",
            identity.display_name(),
            redirect.new_version
        );

        let mut effective = identity.clone();
        effective.version = redirect.new_version;
        effective
    }
}

fn attribute_value<'a>(attribute: &'a Attribute<'a>) -> Result<Cow<'a, str>> {
    attribute
        .unescape_value()
        .map_err(|e| Error::Configuration(format!("Invalid attribute value: {e}")))
}

fn read_assembly_identity(
    element: &BytesStart<'_>,
    current: &mut PendingDependentAssembly,
) -> Result<()> {
    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|e| Error::Configuration(format!("Invalid attribute: {e}")))?;
        let value = attribute_value(&attribute)?;

        match attribute.key.local_name().as_ref() {
            b"name" => current.name = Some(value.trim().to_string()),
            b"publicKeyToken" => {
                let value = value.trim();
                if !value.is_empty() && !value.eq_ignore_ascii_case("null") {
                    current.public_key_token =
                        Some(PublicKeyToken::parse(value).map_err(|e| {
                            Error::Configuration(format!("Invalid publicKeyToken: {e}"))
                        })?);
                }
            }
            b"culture" => {
                let value = value.trim();
                if !value.is_empty() && !value.eq_ignore_ascii_case("neutral") {
                    current.culture = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn read_binding_redirect(
    element: &BytesStart<'_>,
    current: &mut PendingDependentAssembly,
) -> Result<()> {
    let mut old_version = None;
    let mut new_version = None;

    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|e| Error::Configuration(format!("Invalid attribute: {e}")))?;
        let value = attribute_value(&attribute)?;

        match attribute.key.local_name().as_ref() {
            b"oldVersion" => {
                old_version = Some(VersionRange::parse(&value).map_err(|e| {
                    Error::Configuration(format!("Invalid oldVersion '{value}': {e}"))
                })?);
            }
            b"newVersion" => {
                new_version = Some(AssemblyVersion::parse(&value).map_err(|e| {
                    Error::Configuration(format!("Invalid newVersion '{value}': {e}"))
                })?);
            }
            _ => {}
        }
    }

    match (old_version, new_version) {
        (Some(old_version), Some(new_version)) => {
            current.redirects.push((old_version, new_version));
            Ok(())
        }
        _ => Err(Error::Configuration(
            "bindingRedirect requires oldVersion and newVersion".to_string(),
        )),
    }
}

fn push_dependent_assembly(entries: &mut Vec<BindingRedirect>, done: PendingDependentAssembly) {
    let Some(name) = done.name else {
        return;
    };

    for (old_version, new_version) in done.redirects {
        entries.push(BindingRedirect {
            name: name.clone(),
            public_key_token: done.public_key_token,
            culture: done.culture.clone(),
            old_version,
            new_version,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
  <startup>
    <supportedRuntime version="v4.0" sku=".NETFramework,Version=v4.7.2" />
  </startup>
  <runtime>
    <assemblyBinding xmlns="urn:schemas-microsoft-com:asm.v1">
      <dependentAssembly>
        <assemblyIdentity name="Newtonsoft.Json" publicKeyToken="30ad4fe6b2a6aeed" culture="neutral" />
        <bindingRedirect oldVersion="0.0.0.0-13.0.0.0" newVersion="13.0.0.0" />
      </dependentAssembly>
      <dependentAssembly>
        <assemblyIdentity name="Contoso.Core" />
        <bindingRedirect oldVersion="1.0.0.0" newVersion="1.1.0.0" />
        <bindingRedirect oldVersion="2.0.0.0-2.9.0.0" newVersion="3.0.0.0" />
      </dependentAssembly>
      <dependentAssembly>
        <assemblyIdentity name="Contoso.Core" />
        <bindingRedirect oldVersion="1.0.0.0" newVersion="9.9.9.9" />
      </dependentAssembly>
    </assemblyBinding>
  </runtime>
</configuration>"#;

    fn identity(name: &str, version: AssemblyVersion) -> AssemblyIdentity {
        AssemblyIdentity::new(name, version)
    }

    #[test]
    fn parse_entries() {
        let redirects = BindingRedirects::parse(CONFIG).unwrap();
        assert_eq!(redirects.len(), 4);

        let json = &redirects.entries()[0];
        assert_eq!(json.name, "Newtonsoft.Json");
        assert_eq!(
            json.public_key_token.unwrap().to_string(),
            "30ad4fe6b2a6aeed"
        );
        assert!(json.culture.is_none());
        assert_eq!(json.old_version.low, AssemblyVersion::new(0, 0, 0, 0));
        assert_eq!(json.new_version, AssemblyVersion::new(13, 0, 0, 0));

        let core = &redirects.entries()[2];
        assert_eq!(
            core.old_version,
            VersionRange::new(AssemblyVersion::new(2, 0, 0, 0), AssemblyVersion::new(2, 9, 0, 0))
        );
    }

    #[test]
    fn apply_first_match_wins() {
        let redirects = BindingRedirects::parse(CONFIG).unwrap();

        let core = identity("contoso.core", AssemblyVersion::new(1, 0, 0, 0));
        assert_eq!(
            redirects.apply(&core).version,
            AssemblyVersion::new(1, 1, 0, 0)
        );

        let core2 = identity("Contoso.Core", AssemblyVersion::new(2, 5, 0, 0));
        assert_eq!(
            redirects.apply(&core2).version,
            AssemblyVersion::new(3, 0, 0, 0)
        );

        let untouched = identity("Contoso.Core", AssemblyVersion::new(4, 0, 0, 0));
        assert_eq!(redirects.apply(&untouched), untouched);
    }

    #[test]
    fn apply_requires_token_and_culture() {
        let redirects = BindingRedirects::parse(CONFIG).unwrap();

        let unsigned = identity("Newtonsoft.Json", AssemblyVersion::new(12, 0, 0, 0));
        assert_eq!(redirects.apply(&unsigned), unsigned);

        let signed = unsigned
            .clone()
            .with_public_key_token(PublicKeyToken::parse("30ad4fe6b2a6aeed").unwrap());
        assert_eq!(
            redirects.apply(&signed).version,
            AssemblyVersion::new(13, 0, 0, 0)
        );

        let localized = signed.with_culture("de");
        assert_eq!(redirects.apply(&localized), localized);
    }

    #[test]
    fn no_redirect_is_identity() {
        let lib = identity("Lib", AssemblyVersion::new(1, 0, 0, 0));
        assert_eq!(NoRedirect.apply(&lib), lib);
    }

    #[test]
    fn invalid_configurations() {
        assert!(matches!(
            BindingRedirects::parse("<configuration><runtime></configuration>"),
            Err(Error::Configuration(_))
        ));

        let bad_version = r#"<dependentAssembly>
            <assemblyIdentity name="Lib" />
            <bindingRedirect oldVersion="1.x" newVersion="2.0.0.0" />
        </dependentAssembly>"#;
        assert!(matches!(
            BindingRedirects::parse(bad_version),
            Err(Error::Configuration(_))
        ));

        let missing_new = r#"<dependentAssembly>
            <assemblyIdentity name="Lib" />
            <bindingRedirect oldVersion="1.0.0.0" />
        </dependentAssembly>"#;
        assert!(BindingRedirects::parse(missing_new).is_err());
    }

    #[test]
    fn entries_without_name_are_dropped() {
        let nameless = r#"<dependentAssembly>
            <bindingRedirect oldVersion="1.0.0.0" newVersion="2.0.0.0" />
        </dependentAssembly>"#;
        assert!(BindingRedirects::parse(nameless).unwrap().is_empty());
    }

    #[test]
    fn from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("App.config");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let redirects = BindingRedirects::from_config(&path).unwrap();
        assert_eq!(redirects.len(), 4);

        let missing = dir.path().join("Missing.config");
        let error = BindingRedirects::from_config(&missing).unwrap_err();
        assert!(matches!(error, Error::ConfigurationNotFound(_)));
        assert!(error.to_string().ends_with("does not exist."));
    }

    #[test]
    fn render_and_read_back() {
        let mut redirects = BindingRedirects::new();
        redirects.push(BindingRedirect {
            name: "Contoso.Core".to_string(),
            public_key_token: Some(PublicKeyToken::new([0xAA; 8])),
            culture: None,
            old_version: VersionRange::new(
                AssemblyVersion::new(1, 0, 0, 0),
                AssemblyVersion::new(2, 0, 0, 0),
            ),
            new_version: AssemblyVersion::new(2, 0, 0, 0),
        });

        let xml = redirects.to_config_xml().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<assemblyBinding xmlns=\"urn:schemas-microsoft-com:asm.v1\">"));
        assert!(xml.contains(
            "<assemblyIdentity name=\"Contoso.Core\" publicKeyToken=\"aaaaaaaaaaaaaaaa\" culture=\"neutral\"/>"
        ));
        assert!(xml.contains("<bindingRedirect oldVersion=\"1.0.0.0-2.0.0.0\" newVersion=\"2.0.0.0\"/>"));

        assert_eq!(BindingRedirects::parse(&xml).unwrap(), redirects);
    }

    #[test]
    fn version_range() {
        let range = VersionRange::parse("2.0.0.0-1.0.0.0").unwrap();
        assert_eq!(range.low, AssemblyVersion::new(1, 0, 0, 0));
        assert!(range.contains(&AssemblyVersion::new(1, 5, 0, 0)));
        assert!(!range.contains(&AssemblyVersion::new(2, 0, 0, 1)));
        assert_eq!(range.to_string(), "1.0.0.0-2.0.0.0");

        let single = VersionRange::parse("3.0").unwrap();
        assert_eq!(single.to_string(), "3.0.0.0");
    }
}
