//! Slot kinds and their placeholder tokens

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Semantic entity kind that can be generalized out of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Academic program name from the closed lexicon
    Program,
    /// Year level such as "3rd year"
    YearLevel,
    /// Free-form person name
    PersonName,
}

impl SlotKind {
    pub const ALL: [SlotKind; 3] = [SlotKind::Program, SlotKind::YearLevel, SlotKind::PersonName];

    /// Fixed token standing in for every value of this kind
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Program => "<PROGRAM>",
            Self::YearLevel => "<YEAR_LEVEL>",
            Self::PersonName => "<PERSON>",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::YearLevel => "year_level",
            Self::PersonName => "person_name",
        }
    }

    /// Parse an exact placeholder token
    pub fn from_placeholder(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.placeholder() == token)
    }

    /// Whether `value` is exactly one of the placeholder tokens
    pub fn is_placeholder(value: &str) -> bool {
        Self::from_placeholder(value).is_some()
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte ranges of every placeholder token already present in `text`
pub fn placeholder_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = SlotKind::ALL
        .iter()
        .flat_map(|kind| {
            let token = kind.placeholder();
            text.match_indices(token)
                .map(move |(start, _)| start..start + token.len())
        })
        .collect();
    spans.sort_by_key(|r| r.start);
    spans
}

/// Whether `range` intersects any of `spans`
pub fn overlaps_any(range: &Range<usize>, spans: &[Range<usize>]) -> bool {
    spans
        .iter()
        .any(|s| range.start < s.end && s.start < range.end)
}

/// Whether `range` intersects or directly abuts any of `spans`
///
/// A placeholder's angle brackets create word boundaries that were absent
/// before it was inserted, so a match touching one must be left alone.
pub fn touches_any(range: &Range<usize>, spans: &[Range<usize>]) -> bool {
    spans
        .iter()
        .any(|s| range.start <= s.end && s.start <= range.end)
}
