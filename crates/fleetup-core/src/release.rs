//! Release identifiers as reported by the conductor.
//!
//! A release string looks like `5.5.2-1.el7` or `5.4.0.r1`: a numeric
//! `major.minor.patch` triple followed by packaging metadata. The
//! *unified* form keeps only the triple and is what gets compared when
//! deciding whether a router already runs (or has downloaded) a target.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Releases below this triple are never offered for upgrade.
pub const MIN_RELEASE: (u64, u64, u64) = (5, 4, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("invalid release identifier: {0:?}")]
    Invalid(String),
}

/// A parsed release: numeric triple plus optional build suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    raw: String,
    version: semver::Version,
    suffix: Option<String>,
}

impl ReleaseVersion {
    pub fn parse(raw: &str) -> Result<Self, ReleaseError> {
        let raw = raw.trim();
        let head = raw.split('-').next().unwrap_or_default();
        let parts: Vec<&str> = head.split('.').take(3).collect();
        if parts.len() < 3 {
            return Err(ReleaseError::Invalid(raw.to_string()));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| ReleaseError::Invalid(raw.to_string()))?;
        }

        // The triple text is always a prefix of the raw string.
        let triple_len = parts.iter().map(|p| p.len()).sum::<usize>() + 2;
        let suffix = &raw[triple_len..];

        Ok(Self {
            raw: raw.to_string(),
            version: semver::Version::new(numbers[0], numbers[1], numbers[2]),
            suffix: (!suffix.is_empty()).then(|| suffix.to_string()),
        })
    }

    /// `(major, minor, patch)`.
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.version.major, self.version.minor, self.version.patch)
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// The release without its build suffix, e.g. `5.5.2`.
    pub fn unified(&self) -> String {
        self.version.to_string()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Strictly older by triple. Equal triples are not older,
    /// whatever their suffixes.
    pub fn is_older_than(&self, other: &ReleaseVersion) -> bool {
        self.version < other.version
    }

    /// Whether this release is at or above [`MIN_RELEASE`].
    pub fn meets_floor(&self) -> bool {
        self.triple() >= MIN_RELEASE
    }
}

impl FromStr for ReleaseVersion {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Unified form of an arbitrary release string, without validating it.
///
/// `5.5.2-1.el7` → `5.5.2`, `5.4.0.r1` → `5.4.0`, `5.5` → `5.5`.
pub fn unified_release(raw: &str) -> String {
    let head = raw.trim().split('-').next().unwrap_or_default();
    head.split('.').take(3).collect::<Vec<_>>().join(".")
}
