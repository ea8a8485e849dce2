//! Hierarchical resource identifiers.
//!
//! # Responsibility
//! - Parse `[scheme://]authority/segment/...` strings into segments.
//! - Build item identifiers from collection identifiers and keys.
//! - Answer segment-wise ancestry questions for change notification.
//!
//! # Invariants
//! - Empty path segments are dropped; `pets/` and `pets` are the same path.
//! - Ancestry is segment-wise: `pets/4` is not an ancestor of `pets/42`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static CONTENT_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://)?(?P<authority>[^/?#\s:]+(?::[0-9]+)?)(?P<path>/[^?#\s]*)?$")
        .expect("valid content uri regex")
});

/// Identifier string that does not have identifier shape at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriParseError(pub String);

impl Display for UriParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed content uri: `{}`", self.0)
    }
}

impl Error for UriParseError {}

/// Parsed resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    scheme: Option<String>,
    authority: String,
    segments: Vec<String>,
}

impl ContentUri {
    /// Parses an identifier string.
    ///
    /// # Errors
    /// - Returns `UriParseError` when no authority can be found or the text
    ///   contains whitespace, a query or a fragment.
    pub fn parse(value: &str) -> Result<Self, UriParseError> {
        let captures = CONTENT_URI_RE
            .captures(value.trim())
            .ok_or_else(|| UriParseError(value.to_string()))?;

        let scheme = captures.name("scheme").map(|m| m.as_str().to_string());
        let authority = captures["authority"].to_string();
        let segments = captures
            .name("path")
            .map(|m| split_segments(m.as_str()))
            .unwrap_or_default();

        Ok(Self {
            scheme,
            authority,
            segments,
        })
    }

    /// Builds `content://authority/path` from parts.
    pub fn from_parts(scheme: Option<&str>, authority: &str, path: &str) -> Self {
        Self {
            scheme: scheme.map(str::to_string),
            authority: authority.to_string(),
            segments: split_segments(path),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns a child identifier with `segment` appended.
    pub fn with_appended_segment(&self, segment: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.segments.push(segment.into());
        child
    }

    /// Returns the item identifier for `id` under this collection.
    pub fn with_appended_id(&self, id: i64) -> Self {
        self.with_appended_segment(id.to_string())
    }

    /// Parses the last segment as a numeric key.
    pub fn parse_id(&self) -> Option<i64> {
        self.segments.last().and_then(|segment| parse_digits(segment))
    }

    /// Returns the identifier one level up, or `None` at the authority root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    /// True when `other` lies strictly below `self` in the hierarchy.
    ///
    /// Scheme is ignored so `content://a/pets` and `a/pets` name the same
    /// resource.
    pub fn is_ancestor_of(&self, other: &ContentUri) -> bool {
        self.authority == other.authority
            && self.segments.len() < other.segments.len()
            && other.segments.starts_with(&self.segments)
    }

    /// Same resource, ignoring scheme.
    pub fn same_resource(&self, other: &ContentUri) -> bool {
        self.authority == other.authority && self.segments == other.segments
    }
}

impl FromStr for ContentUri {
    type Err = UriParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for ContentUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        f.write_str(&self.authority)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Parses a run of ASCII digits into an `i64`. Signs, blanks and overflow
/// are rejected.
pub(crate) fn parse_digits(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse::<i64>().ok()
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
