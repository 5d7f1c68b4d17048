//! Path pattern parsing and best-match selection.
//!
//! # Responsibilities
//! - Parse `/`-separated patterns into literal, `%required` and `?optional` segments
//! - Score every candidate against a requested path and pick the best one
//! - Extract placeholder values from a matched request path
//!
//! # Scoring
//! ```text
//! segment 0 is the root and always matches
//! for each pattern segment i:
//!     ?name        → matched (request segment may be absent)
//!     %name        → matched if request has a segment at i
//!     literal      → matched if request segment i equals it (case-insensitive)
//!     otherwise    → stop scoring
//! eligible ⇔ score == pattern segment count
//! ```
//! Extra trailing request segments are ignored, so `/users/%id` also matches
//! `/users/42/edit`.
//!
//! # Design Decisions
//! - Ties on score prefer more literal segments, then more required
//!   placeholders, then the earlier candidate
//! - Empty segments (`//`, trailing `/`) are skipped on both sides
//! - Literal text is compared raw; captured values are percent-decoded

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::routing::error::RouteError;

const SEPARATOR: char = '/';
const REQUIRED_PREFIX: char = '%';
const OPTIONAL_PREFIX: char = '?';

/// One segment of a parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Root,
    Literal(String),
    Required(String),
    Optional(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if let Some(name) = raw.strip_prefix(REQUIRED_PREFIX) {
            Segment::Required(name.to_string())
        } else if let Some(name) = raw.strip_prefix(OPTIONAL_PREFIX) {
            Segment::Optional(name.to_string())
        } else {
            Segment::Literal(raw.to_string())
        }
    }

    /// Placeholder name, if this segment captures a value.
    pub fn placeholder(&self) -> Option<&str> {
        match self {
            Segment::Required(name) | Segment::Optional(name) => Some(name),
            Segment::Root | Segment::Literal(_) => None,
        }
    }

    fn matches(&self, requested: Option<&str>) -> bool {
        match (self, requested) {
            (Segment::Root, _) | (Segment::Optional(_), _) => true,
            (Segment::Required(_), Some(_)) => true,
            (Segment::Literal(text), Some(segment)) => eq_ignore_case(text, segment),
            (_, None) => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Root => Ok(()),
            Segment::Literal(text) => write!(f, "{SEPARATOR}{text}"),
            Segment::Required(name) => write!(f, "{SEPARATOR}{REQUIRED_PREFIX}{name}"),
            Segment::Optional(name) => write!(f, "{SEPARATOR}{OPTIONAL_PREFIX}{name}"),
        }
    }
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse `pattern`, rejecting empty placeholder names and duplicate captures.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with(SEPARATOR) {
            return Err(invalid("pattern must start with '/'"));
        }

        let mut segments = vec![Segment::Root];
        for raw in split_segments(pattern) {
            let segment = Segment::parse(raw);
            if let Some(name) = segment.placeholder() {
                if name.is_empty() {
                    return Err(invalid("placeholder name is empty"));
                }
                if segments.iter().any(|existing| existing.placeholder() == Some(name)) {
                    return Err(invalid("placeholder name is used twice"));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern text as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in pattern order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::placeholder)
    }

    /// Number of leading segments satisfied by `requested` (root included).
    fn score(&self, requested: &[&str]) -> usize {
        self.segments
            .iter()
            .enumerate()
            .take_while(|(index, segment)| segment.matches(requested.get(*index).copied()))
            .count()
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Literal(_)))
            .count()
    }

    fn required_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Required(_)))
            .count()
    }

    /// True when every segment of this pattern is satisfied by `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.score(&split_request(path)) == self.segments.len()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl AsRef<PathPattern> for PathPattern {
    fn as_ref(&self) -> &PathPattern {
        self
    }
}

/// Values captured from a request path, in pattern order.
///
/// Absent optional segments are kept with a `None` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables {
    entries: Vec<(String, Option<String>)>,
}

impl PathVariables {
    /// Captured value for `name`; `None` when unknown or not present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// True when the pattern declares `name`, present or not.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PathVariables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Pick the best candidate for `requested`, or `None` if none is eligible.
pub fn find_best_match<'a, T>(requested: &str, candidates: impl IntoIterator<Item = &'a T>) -> Option<&'a T>
where
    T: AsRef<PathPattern> + ?Sized + 'a,
{
    let segments = split_request(requested);
    let mut best: Option<(&'a T, (usize, usize, usize))> = None;

    for candidate in candidates {
        let pattern = candidate.as_ref();
        let score = pattern.score(&segments);
        if score != pattern.segments.len() {
            continue;
        }

        let rank = (score, pattern.literal_count(), pattern.required_count());
        // Strictly greater keeps the earlier candidate on a full tie.
        if best.map_or(true, |(_, best_rank)| rank > best_rank) {
            best = Some((candidate, rank));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Placeholder values of `pattern` taken from `requested`.
pub fn extract_path_variables(requested: &str, pattern: &PathPattern) -> PathVariables {
    let segments = split_request(requested);
    let entries = pattern
        .segments
        .iter()
        .enumerate()
        .filter_map(|(index, segment)| {
            let name = segment.placeholder()?;
            let value = segments.get(index).map(|raw| decode(raw));
            Some((name.to_string(), value))
        })
        .collect();
    PathVariables { entries }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Request segments with the synthetic root at index 0.
fn split_request(path: &str) -> Vec<&str> {
    std::iter::once("").chain(split_segments(path)).collect()
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn eq_ignore_case(left: &str, right: &str) -> bool {
    if left.is_ascii() && right.is_ascii() {
        left.eq_ignore_ascii_case(right)
    } else {
        left.to_lowercase() == right.to_lowercase()
    }
}
