//! Patch-set versions and the stamp line that records them in patched output.
//!
//! A stamped document starts with a comment line such as
//! `-- patched-by seed-e2e-fixes@1.0.0`. When a set is run again, the stamp
//! tells the pipeline the set was already applied at that version or newer.

use semver::Version;
use std::fmt;

const STAMP_TAG: &str = "patched-by";

/// Errors during version comparison
#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

fn parse_version(value: &str) -> Result<Version, VersionError> {
    Version::parse(value.trim()).map_err(|e| VersionError::InvalidVersion {
        value: value.to_string(),
        source: e.to_string(),
    })
}

/// Record of which patch set produced a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub name: String,
    pub version: String,
}

impl Stamp {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn line(&self, comment_prefix: &str) -> String {
        format!("{comment_prefix} {STAMP_TAG} {}@{}", self.name, self.version)
    }

    /// Parse a single line. Returns `None` for anything that is not a stamp.
    pub fn parse_line(line: &str, comment_prefix: &str) -> Option<Self> {
        let rest = line.trim_end().strip_prefix(comment_prefix)?;
        let rest = rest.trim_start().strip_prefix(STAMP_TAG)?;
        let rest = rest.strip_prefix(char::is_whitespace)?;
        let (name, version) = rest.trim().rsplit_once('@')?;
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self::new(name, version))
    }

    /// All stamps in `text`, in document order.
    pub fn find_all(text: &str, comment_prefix: &str) -> Vec<Self> {
        text.lines()
            .filter_map(|line| Self::parse_line(line, comment_prefix))
            .collect()
    }

    /// Whether this stamp shows `version` (or newer) of the same set was applied.
    ///
    /// # Examples
    ///
    /// ```
    /// use seed_patcher::config::version::Stamp;
    ///
    /// let stamp = Stamp::new("fixes", "1.2.0");
    /// assert!(stamp.covers("fixes", "1.0.0").unwrap());
    /// assert!(!stamp.covers("fixes", "2.0.0").unwrap());
    /// ```
    pub fn covers(&self, name: &str, version: &str) -> Result<bool, VersionError> {
        if self.name != name {
            return Ok(false);
        }
        let wanted = parse_version(version)?;
        // A hand-edited stamp with a garbled version never counts as applied.
        Ok(Version::parse(self.version.trim()).is_ok_and(|stamped| stamped >= wanted))
    }
}

/// Find the first stamp in `text` that covers `name@version`.
pub fn applied_stamp(
    text: &str,
    comment_prefix: &str,
    name: &str,
    version: &str,
) -> Result<Option<Stamp>, VersionError> {
    for stamp in Stamp::find_all(text, comment_prefix) {
        if stamp.covers(name, version)? {
            return Ok(Some(stamp));
        }
    }
    Ok(None)
}

/// Replace any stamp of the same set with a fresh one at the top of `text`.
pub fn restamp(text: &str, comment_prefix: &str, stamp: &Stamp) -> String {
    let mut out = stamp.line(comment_prefix);
    out.push('\n');
    for line in text.split_inclusive('\n') {
        let stale = Stamp::parse_line(line, comment_prefix)
            .is_some_and(|existing| existing.name == stamp.name);
        if !stale {
            out.push_str(line);
        }
    }
    out
}
