//! Template language versions.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Error produced when a language version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid language version '{input}', expected 'X.Y'")]
pub struct VersionError {
    /// The rejected input.
    pub input: String,
}

/// A template language version.
///
/// The version determines which directives and pipeline passes are active,
/// so it is ordered: feature tiers are expressed as `>=` comparisons against
/// well-known versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct LanguageVersion {
    major: u32,
    minor: u32,
}

impl LanguageVersion {
    /// The first version with component support.
    pub const V1_0: LanguageVersion = LanguageVersion { major: 1, minor: 0 };
    /// Adds scoped styles and the preserve-whitespace directive.
    pub const V2_0: LanguageVersion = LanguageVersion { major: 2, minor: 0 };
    /// Adds constrained type parameters on generic components.
    pub const V3_0: LanguageVersion = LanguageVersion { major: 3, minor: 0 };

    /// The newest version this compiler understands.
    pub const LATEST: LanguageVersion = LanguageVersion::V3_0;

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl Default for LanguageVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl TryFrom<String> for LanguageVersion {
    type Error = VersionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for LanguageVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for LanguageVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionError { input: s.to_owned() };

        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::LATEST);
        }

        let (major, minor) = s.split_once('.').ok_or_else(err)?;
        Ok(Self {
            major: major.parse().map_err(|_| err())?,
            minor: minor.parse().map_err(|_| err())?,
        })
    }
}
