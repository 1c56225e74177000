//! Closed-vocabulary extractor for program names

use std::collections::BTreeSet;

use regex::Regex;

use super::extractor::{EntityExtractor, replace_matches};
use super::slot::SlotKind;
use crate::error::Result;

/// Matches known program names as whole words, case-insensitively
///
/// Multi-word terms match across any run of whitespace. Longer terms are tried
/// first, so "computer science education" wins over "computer science".
#[derive(Debug, Clone)]
pub struct LexiconExtractor {
    terms: BTreeSet<String>,
    pattern: Option<Regex>,
}

impl LexiconExtractor {
    pub fn new<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: BTreeSet<String> = terms
            .into_iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();

        let pattern = if terms.is_empty() {
            None
        } else {
            let mut ordered: Vec<&String> = terms.iter().collect();
            ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

            let alternation = ordered
                .iter()
                .map(|t| {
                    t.split(' ')
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join(r"\s+")
                })
                .collect::<Vec<_>>()
                .join("|");

            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };

        Ok(Self { terms, pattern })
    }

    /// Whether `value` is exactly a known term
    pub fn is_known(&self, value: &str) -> bool {
        self.terms.contains(&normalize(value))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn normalize(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl EntityExtractor for LexiconExtractor {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Program
    }

    fn generalize_text(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => replace_matches(text, pattern, self.placeholder()),
            None => text.to_string(),
        }
    }

    fn generalizes_param(&self, _key: &str, value: &str) -> bool {
        self.is_known(value)
    }
}
