//! Statistical person-name model
//!
//! The model is a scored gazetteer provisioned as a JSON file:
//!
//! ```json
//! {
//!   "given_names": ["juan", "maria"],
//!   "surnames": ["cruz", "santos"],
//!   "particles": ["dela", "de", "del", "delos"],
//!   "threshold": 0.6
//! }
//! ```
//!
//! Candidate spans are runs of capitalized words (lower-case particles may sit
//! inside a run). A span must start with a known given name, and the share of
//! its words found in the gazetteer must reach the threshold. It is loaded once
//! at process start and shared read-only afterwards.

use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use super::slot::{overlaps_any, placeholder_spans};
use crate::error::{Error, Result};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}[\p{L}'’\-]*").expect("word pattern is valid"));

const DEFAULT_THRESHOLD: f32 = 0.6;

#[derive(Debug, Deserialize)]
struct NameModelFile {
    #[serde(default)]
    given_names: Vec<String>,
    #[serde(default)]
    surnames: Vec<String>,
    #[serde(default)]
    particles: Vec<String>,
    threshold: Option<f32>,
}

/// A recognized person-name span
#[derive(Debug, Clone, PartialEq)]
pub struct NameSpan {
    pub range: Range<usize>,
    pub text: String,
    pub score: f32,
}

/// Read-only person-name recognizer
#[derive(Debug, Clone)]
pub struct NameModel {
    given_names: HashSet<String>,
    surnames: HashSet<String>,
    particles: HashSet<String>,
    threshold: f32,
}

struct Word<'a> {
    range: Range<usize>,
    text: &'a str,
    possessive: bool,
}

impl NameModel {
    pub fn new<G, S, P>(given_names: G, surnames: S, particles: P) -> Self
    where
        G: IntoIterator,
        G::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        fn lower<I>(items: I) -> HashSet<String>
        where
            I: IntoIterator,
            I::Item: AsRef<str>,
        {
            items
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        }

        Self {
            given_names: lower(given_names),
            surnames: lower(surnames),
            particles: lower(particles),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Load a model from a JSON gazetteer file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::ModelLoadFailed(path.to_path_buf(), e.to_string()))?;
        let file: NameModelFile = serde_json::from_str(&raw)
            .map_err(|e| Error::ModelLoadFailed(path.to_path_buf(), e.to_string()))?;

        if file.given_names.is_empty() {
            return Err(Error::ModelLoadFailed(
                path.to_path_buf(),
                "model has no given names".to_string(),
            ));
        }

        let model = Self::new(file.given_names, file.surnames, file.particles)
            .with_threshold(file.threshold.unwrap_or(DEFAULT_THRESHOLD));

        info!(
            path = %path.display(),
            given_names = model.given_names.len(),
            surnames = model.surnames.len(),
            "Loaded name model"
        );
        Ok(model)
    }

    /// Find person-name spans in `text`, ignoring placeholder tokens
    pub fn recognize(&self, text: &str) -> Vec<NameSpan> {
        let protected = placeholder_spans(text);
        let words: Vec<Word<'_>> = WORD_RE
            .find_iter(text)
            .filter(|m| !overlaps_any(&m.range(), &protected))
            .map(|m| {
                let raw = m.as_str();
                let stem = raw
                    .strip_suffix("'s")
                    .or_else(|| raw.strip_suffix("’s"))
                    .filter(|s| !s.is_empty());
                match stem {
                    Some(stem) => Word {
                        range: m.start()..m.start() + stem.len(),
                        text: stem,
                        possessive: true,
                    },
                    None => Word {
                        range: m.range(),
                        text: raw,
                        possessive: false,
                    },
                }
            })
            .collect();

        let mut spans = Vec::new();
        let mut run: Vec<&Word<'_>> = Vec::new();

        for (i, word) in words.iter().enumerate() {
            let joined = match run.last() {
                Some(prev) => {
                    !prev.possessive && text[prev.range.end..word.range.start].trim().is_empty()
                }
                None => true,
            };
            if !joined {
                self.close_run(text, &mut run, &mut spans);
            }

            if is_capitalized(word.text) || (!run.is_empty() && self.is_particle(word.text)) {
                run.push(word);
            } else {
                self.close_run(text, &mut run, &mut spans);
            }

            if i + 1 == words.len() {
                self.close_run(text, &mut run, &mut spans);
            }
        }

        spans
    }

    fn close_run(&self, text: &str, run: &mut Vec<&Word<'_>>, spans: &mut Vec<NameSpan>) {
        if let Some(span) = self.score_run(text, run) {
            spans.push(span);
        }
        run.clear();
    }

    fn score_run(&self, text: &str, run: &[&Word<'_>]) -> Option<NameSpan> {
        let start = run
            .iter()
            .position(|w| self.given_names.contains(&w.text.to_lowercase()))?;
        let mut words = &run[start..];
        while let Some((last, rest)) = words.split_last() {
            if self.is_particle(last.text) && !rest.is_empty() {
                words = rest;
            } else {
                break;
            }
        }

        let known = words
            .iter()
            .filter(|w| {
                let lower = w.text.to_lowercase();
                self.given_names.contains(&lower)
                    || self.surnames.contains(&lower)
                    || self.particles.contains(&lower)
            })
            .count();
        let score = known as f32 / words.len() as f32;
        if score < self.threshold {
            return None;
        }

        let range = words.first()?.range.start..words.last()?.range.end;
        Some(NameSpan {
            text: text[range.clone()].to_string(),
            range,
            score,
        })
    }

    fn is_particle(&self, word: &str) -> bool {
        self.particles.contains(&word.to_lowercase())
    }
}

/// Title-case word; all-caps acronyms such as "BSIT" do not count
fn is_capitalized(word: &str) -> bool {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let rest: Vec<char> = chars.filter(|c| c.is_alphabetic()).collect();
    first.is_uppercase() && (rest.is_empty() || rest.iter().any(|c| c.is_lowercase()))
}

/// Load the name model once at startup
///
/// A missing or unreadable model is not fatal: the failure is logged and
/// person-name generalization stays disabled for the life of the process.
pub fn load_name_model(path: Option<&Path>) -> Option<Arc<NameModel>> {
    let Some(path) = path else {
        info!("No name model configured; person-name generalization disabled");
        return None;
    };

    match NameModel::load(path) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            warn!(error = %e, "Name model unavailable; person-name generalization disabled");
            None
        }
    }
}
