//! Rule-based extractor for year levels

use std::sync::LazyLock;

use regex::Regex;

use super::extractor::{EntityExtractor, replace_matches};
use super::slot::SlotKind;

/// "3rd year", "1st-year", "4 year", or a bare single digit
static YEAR_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d(?:st|nd|rd|th)?[\s-]*years?\b|\b\d\b").expect("year level pattern is valid")
});

/// Plan keys treated as year levels when none are configured
pub const DEFAULT_YEAR_KEYS: &[&str] = &["year_level", "year"];

/// Replaces year-level expressions with the year placeholder
///
/// Plan parameters are recognized by key name only: any non-empty string
/// under a year key is generalized whatever it contains.
#[derive(Debug, Clone)]
pub struct YearLevelExtractor {
    keys: Vec<String>,
}

impl YearLevelExtractor {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl Default for YearLevelExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_YEAR_KEYS)
    }
}

impl EntityExtractor for YearLevelExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn kind(&self) -> SlotKind {
        SlotKind::YearLevel
    }

    fn generalize_text(&self, text: &str) -> String {
        replace_matches(text, &YEAR_LEVEL_RE, self.placeholder())
    }

    fn generalizes_param(&self, key: &str, value: &str) -> bool {
        !value.trim().is_empty() && self.keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
}
