//! Assembly identity: the name, version, culture and public key token triple that the runtime
//! uses to tell assemblies apart (ECMA-335 Partition II, 6.1 and 6.2.1).
//!
//! The verifier uses identities in two places: the originating assembly of the module under
//! test, and the resolution scope of every referenced type. Policies name assemblies either by
//! simple name (`"System.IO"`) or by full display name
//! (`"System.IO, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a"`); see
//! [`AssemblyDisplayName`] for the partially specified form.
//!
//! # Examples
//!
//! ```rust
//! use cilguard::metadata::identity::{AssemblyIdentity, AssemblyVersion};
//!
//! let mscorlib = AssemblyIdentity::parse(
//!     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
//! )?;
//! assert_eq!(mscorlib.version, AssemblyVersion::new(4, 0, 0, 0));
//! assert_eq!(
//!     mscorlib.display_name(),
//!     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
//! );
//! # Ok::<(), cilguard::Error>(())
//! ```

use std::{fmt, fmt::Write, str::FromStr};

use crate::{Error, Result};

/// Complete identity of an assembly.
///
/// Equality and hashing cover every component, so two identities differing only in version
/// are different assemblies. Use [`AssemblyDisplayName::matches`] for looser matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple assembly name (e.g. "mscorlib", "System.IO").
    pub name: String,
    /// Four-part version number.
    pub version: AssemblyVersion,
    /// Culture for satellite assemblies; `None` is culture-neutral.
    pub culture: Option<String>,
    /// 8-byte public key token, stored in display order.
    pub public_key_token: Option<[u8; 8]>,
}

/// Four-part version numbering for .NET assemblies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version component.
    pub major: u16,
    /// Minor version component.
    pub minor: u16,
    /// Build version component.
    pub build: u16,
    /// Revision version component.
    pub revision: u16,
}

/// An assembly display name in which everything but the simple name is optional.
///
/// This is the form used by policy rules: a component that was not written down matches any
/// value of that component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyDisplayName {
    /// Simple assembly name.
    pub name: String,
    /// Version, if the display name carried `Version=`.
    pub version: Option<AssemblyVersion>,
    /// Culture, if the display name carried `Culture=`. `Some(None)` is `Culture=neutral`.
    pub culture: Option<Option<String>>,
    /// Public key token, if the display name carried `PublicKeyToken=`. `Some(None)` is `null`.
    pub public_key_token: Option<Option<[u8; 8]>>,
}

impl AssemblyIdentity {
    /// Create a new identity.
    pub fn new(
        name: impl Into<String>,
        version: AssemblyVersion,
        culture: Option<String>,
        public_key_token: Option<[u8; 8]>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            culture,
            public_key_token,
        }
    }

    /// Create a culture-neutral, unsigned identity with version `0.0.0.0`.
    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, AssemblyVersion::default(), None, None)
    }

    /// Parse a display name such as
    /// `"System.IO, Version=4.0.0.0, Culture=neutral, PublicKeyToken=null"`.
    ///
    /// Missing components default to version `0.0.0.0`, neutral culture and no token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the name is empty or a component is invalid.
    pub fn parse(display_name: &str) -> Result<Self> {
        let parsed = AssemblyDisplayName::parse(display_name)?;
        Ok(Self {
            name: parsed.name,
            version: parsed.version.unwrap_or_default(),
            culture: parsed.culture.flatten(),
            public_key_token: parsed.public_key_token.flatten(),
        })
    }

    /// Generate the full display name string for this identity.
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
                for byte in token {
                    let _ = write!(result, "{:02x}", byte);
                }
            }
            None => result.push_str("null"),
        }

        result
    }

    /// The simple assembly name without version or culture.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.name
    }
}

impl AssemblyDisplayName {
    /// Parse a possibly partial display name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the name is empty, a component is unknown or a
    /// component value cannot be parsed.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut result = AssemblyDisplayName {
            name,
            version: None,
            culture: None,
            public_key_token: None,
        };

        for part in parts {
            if let Some(value) = part.strip_prefix("Version=") {
                result.version = Some(AssemblyVersion::parse(value)?);
            } else if let Some(value) = part.strip_prefix("Culture=") {
                result.culture = Some(if value.eq_ignore_ascii_case("neutral") {
                    None
                } else {
                    Some(value.to_string())
                });
            } else if let Some(value) = part.strip_prefix("PublicKeyToken=") {
                result.public_key_token = Some(if value.eq_ignore_ascii_case("null") {
                    None
                } else {
                    Some(parse_public_key_token(value)?)
                });
            } else if part.strip_prefix("ProcessorArchitecture=").is_some() {
                // Not part of the binding identity
            } else {
                return Err(malformed_error!(
                    "Unknown assembly display name component '{}'",
                    part
                ));
            }
        }

        Ok(result)
    }

    /// Returns `true` if the name carries nothing but the simple name.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.version.is_none() && self.culture.is_none() && self.public_key_token.is_none()
    }

    /// Returns `true` if both names match exactly the same identities: equal components, with
    /// the simple name compared case-insensitively.
    #[must_use]
    pub fn is_equivalent(&self, other: &AssemblyDisplayName) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.version == other.version
            && self.culture == other.culture
            && self.public_key_token == other.public_key_token
    }

    /// Returns `true` if every component present in `self` equals the one of `identity`.
    ///
    /// Simple names compare case-insensitively, as the runtime binder does.
    #[must_use]
    pub fn matches(&self, identity: &AssemblyIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&identity.name)
            && self.version.map_or(true, |v| v == identity.version)
            && self
                .culture
                .as_ref()
                .map_or(true, |c| *c == identity.culture)
            && self
                .public_key_token
                .map_or(true, |t| t == identity.public_key_token)
    }
}

impl AssemblyVersion {
    /// Create a version from its four components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse a version string with one to four dot-separated components.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a component is not a `u16` or there are more
    /// than four components.
    pub fn parse(version_str: &str) -> Result<Self> {
        let mut components = [0_u16; 4];
        let mut count = 0;

        for part in version_str.split('.') {
            if count == 4 {
                return Err(malformed_error!(
                    "Version '{}' has more than four components",
                    version_str
                ));
            }
            components[count] = part.trim().parse::<u16>().map_err(|_| {
                malformed_error!("Invalid version component '{}' in '{}'", part, version_str)
            })?;
            count += 1;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

fn parse_public_key_token(value: &str) -> Result<[u8; 8]> {
    if value.len() != 16 || !value.is_ascii() {
        return Err(malformed_error!(
            "PublicKeyToken must be exactly 16 hex characters, got '{}'",
            value
        ));
    }

    let mut token = [0_u8; 8];
    for (index, byte) in token.iter_mut().enumerate() {
        let pair = &value[index * 2..index * 2 + 2];
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| malformed_error!("Invalid hex in PublicKeyToken '{}'", value))?;
    }

    Ok(token)
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

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSCORLIB: &str =
        "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089";

    #[test]
    fn equivalent_display_names() {
        let plain = AssemblyDisplayName::parse("System.IO").unwrap();
        assert!(plain.is_equivalent(&AssemblyDisplayName::parse("system.io").unwrap()));
        assert!(!plain.is_equivalent(&AssemblyDisplayName::parse("System.IO, Version=4.0.0.0").unwrap()));
        assert!(!plain.is_equivalent(&AssemblyDisplayName::parse("System.Net").unwrap()));
    }

    #[test]
    fn parse_full_display_name() {
        let identity = AssemblyIdentity::parse(MSCORLIB).unwrap();
        assert_eq!(identity.name, "mscorlib");
        assert_eq!(identity.version, AssemblyVersion::new(4, 0, 0, 0));
        assert_eq!(identity.culture, None);
        assert_eq!(
            identity.public_key_token,
            Some([0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89])
        );
        assert_eq!(identity.display_name(), MSCORLIB);
    }

    #[test]
    fn parse_simple_name() {
        let identity = AssemblyIdentity::parse("Plugin").unwrap();
        assert_eq!(
            identity.display_name(),
            "Plugin, Version=0.0.0.0, Culture=neutral, PublicKeyToken=null"
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(AssemblyIdentity::parse("").is_err());
        assert!(AssemblyIdentity::parse(" , Version=1.0").is_err());
        assert!(AssemblyIdentity::parse("A, Version=1.x").is_err());
        assert!(AssemblyIdentity::parse("A, Version=1.2.3.4.5").is_err());
        assert!(AssemblyIdentity::parse("A, PublicKeyToken=abcd").is_err());
        assert!(AssemblyIdentity::parse("A, Flavor=spicy").is_err());
    }

    #[test]
    fn partial_version() {
        assert_eq!(
            AssemblyVersion::parse("2.1").unwrap(),
            AssemblyVersion::new(2, 1, 0, 0)
        );
    }

    #[test]
    fn display_name_pattern_matching() {
        let mscorlib = AssemblyIdentity::parse(MSCORLIB).unwrap();

        let by_name = AssemblyDisplayName::parse("mscorlib").unwrap();
        assert!(by_name.is_simple());
        assert!(by_name.matches(&mscorlib));

        let exact = AssemblyDisplayName::parse("mscorlib, Version=4.0.0.0").unwrap();
        assert!(!exact.is_simple());
        assert!(exact.matches(&mscorlib));

        let other_version = AssemblyDisplayName::parse("mscorlib, Version=2.0.0.0").unwrap();
        assert!(!other_version.matches(&mscorlib));

        let unsigned = AssemblyDisplayName::parse("mscorlib, PublicKeyToken=null").unwrap();
        assert!(!unsigned.matches(&mscorlib));
    }

    #[test]
    fn equality_covers_version() {
        let a = AssemblyIdentity::parse("A, Version=1.0.0.0").unwrap();
        let b = AssemblyIdentity::parse("A, Version=1.0.0.1").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, "A, Version=1.0.0.0".parse::<AssemblyIdentity>().unwrap());
    }
}
