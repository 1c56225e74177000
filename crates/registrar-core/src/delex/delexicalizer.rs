//! Delexicalizer: query + plan -> template + generalized plan

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::extractor::EntityExtractor;
use super::lexicon::LexiconExtractor;
use super::model::NameModel;
use super::pattern::YearLevelExtractor;
use super::person::PersonNameExtractor;
use super::plan::{DelexicalizedResult, QueryPlan};
use super::slot::SlotKind;
use crate::error::Result;

/// Runs an ordered list of extractors over a query and its plan
///
/// Each stage sees the text as rewritten by the stages before it. A plan
/// value that already holds a placeholder is never revisited, and non-string
/// values pass through untouched.
pub struct Delexicalizer {
    extractors: Vec<Box<dyn EntityExtractor>>,
}

impl Delexicalizer {
    /// Create a delexicalizer with no stages
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Append a stage to the end of the pipeline
    pub fn with_extractor(mut self, extractor: Box<dyn EntityExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Standard pipeline: program lexicon, then year levels, then person names
    pub fn standard<P, Y>(
        programs: P,
        year_keys: Y,
        name_model: Option<Arc<NameModel>>,
        name_key_signal: &str,
    ) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        Y: IntoIterator,
        Y::Item: AsRef<str>,
    {
        Ok(Self::new()
            .with_extractor(Box::new(LexiconExtractor::new(programs)?))
            .with_extractor(Box::new(YearLevelExtractor::new(year_keys)))
            .with_extractor(Box::new(
                PersonNameExtractor::new(name_model).with_key_signal(name_key_signal),
            )))
    }

    /// Names of the stages in execution order, with whether each is enabled
    pub fn stages(&self) -> Vec<(&'static str, bool)> {
        self.extractors
            .iter()
            .map(|e| (e.name(), e.is_enabled()))
            .collect()
    }

    /// Rewrite `query` into a template and generalize matching plan values
    ///
    /// The input plan is not modified; the result holds a copy.
    pub fn delexicalize(&self, query: &str, plan: &QueryPlan) -> DelexicalizedResult {
        let mut template = query.to_string();
        let mut parameters = plan.clone();

        for extractor in self.extractors.iter().filter(|e| e.is_enabled()) {
            template = extractor.generalize_text(&template);

            for (key, value) in parameters.iter_mut() {
                let Value::String(text) = value else {
                    continue;
                };
                if SlotKind::is_placeholder(text) {
                    continue;
                }
                if extractor.generalizes_param(key, text) {
                    debug!(stage = extractor.name(), key = %key, "Generalized plan parameter");
                    *value = Value::String(extractor.placeholder().to_string());
                }
            }
        }

        debug!(template = %template, "Delexicalized query");
        DelexicalizedResult {
            template,
            parameters,
        }
    }
}

impl Default for Delexicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Delexicalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delexicalizer")
            .field("stages", &self.stages())
            .finish()
    }
}
