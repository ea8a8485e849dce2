//! Static identifier-pattern table.
//!
//! # Responsibility
//! - Map `(authority, path pattern)` entries to caller-defined codes.
//! - Classify a `ContentUri` against the table without I/O.
//!
//! # Invariants
//! - The table is built once and never mutated after `build()`.
//! - `#` matches one segment of ASCII digits that fits an `i64`; `*` matches
//!   one arbitrary segment; anything else matches literally.
//! - Entries are tried in registration order; the first match wins.

use crate::uri::content_uri::{parse_digits, ContentUri};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    Number,
    Text,
}

#[derive(Debug, Clone)]
struct MatcherEntry<C> {
    authority: String,
    pattern: Vec<PatternSegment>,
    code: C,
}

/// Builder for an immutable `UriMatcher`.
#[derive(Debug, Clone)]
pub struct UriMatcherBuilder<C> {
    entries: Vec<MatcherEntry<C>>,
}

impl<C: Copy> UriMatcherBuilder<C> {
    /// Registers `path` under `authority` with result `code`.
    pub fn add(mut self, authority: &str, path: &str, code: C) -> Self {
        let pattern = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "#" => PatternSegment::Number,
                "*" => PatternSegment::Text,
                literal => PatternSegment::Literal(literal.to_string()),
            })
            .collect();
        self.entries.push(MatcherEntry {
            authority: authority.to_string(),
            pattern,
            code,
        });
        self
    }

    pub fn build(self) -> UriMatcher<C> {
        UriMatcher {
            entries: self.entries,
        }
    }
}

/// Immutable routing table from identifier patterns to codes.
#[derive(Debug, Clone)]
pub struct UriMatcher<C> {
    entries: Vec<MatcherEntry<C>>,
}

impl<C: Copy> UriMatcher<C> {
    pub fn builder() -> UriMatcherBuilder<C> {
        UriMatcherBuilder {
            entries: Vec::new(),
        }
    }

    /// Returns the code of the first entry matching `uri`, if any.
    pub fn match_uri(&self, uri: &ContentUri) -> Option<C> {
        self.entries
            .iter()
            .find(|entry| entry_matches(entry, uri))
            .map(|entry| entry.code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry_matches<C>(entry: &MatcherEntry<C>, uri: &ContentUri) -> bool {
    if entry.authority != uri.authority() || entry.pattern.len() != uri.segments().len() {
        return false;
    }

    entry
        .pattern
        .iter()
        .zip(uri.segments())
        .all(|(pattern, segment)| match pattern {
            PatternSegment::Literal(literal) => literal == segment,
            PatternSegment::Number => parse_digits(segment).is_some(),
            PatternSegment::Text => true,
        })
}
