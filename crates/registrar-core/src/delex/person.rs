//! Statistical extractor for person names

use std::sync::Arc;

use super::extractor::EntityExtractor;
use super::model::NameModel;
use super::slot::SlotKind;

/// Plan keys containing this substring hold person names by default
pub const DEFAULT_NAME_KEY_SIGNAL: &str = "name";

/// Replaces person names recognized by the shared [`NameModel`]
///
/// Without a model the extractor is disabled and leaves both the text and the
/// plan alone.
#[derive(Debug, Clone)]
pub struct PersonNameExtractor {
    model: Option<Arc<NameModel>>,
    key_signal: String,
}

impl PersonNameExtractor {
    pub fn new(model: Option<Arc<NameModel>>) -> Self {
        Self {
            model,
            key_signal: DEFAULT_NAME_KEY_SIGNAL.to_string(),
        }
    }

    pub fn with_key_signal(mut self, signal: impl AsRef<str>) -> Self {
        self.key_signal = signal.as_ref().trim().to_lowercase();
        self
    }
}

impl EntityExtractor for PersonNameExtractor {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn kind(&self) -> SlotKind {
        SlotKind::PersonName
    }

    fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    fn generalize_text(&self, text: &str) -> String {
        let Some(model) = &self.model else {
            return text.to_string();
        };

        // Literal substitution per recognized entity; every occurrence of the
        // same surface form is replaced.
        let mut out = text.to_string();
        for span in model.recognize(text) {
            out = out.replace(&span.text, self.placeholder());
        }
        out
    }

    fn generalizes_param(&self, key: &str, value: &str) -> bool {
        self.model.is_some()
            && !self.key_signal.is_empty()
            && key.to_lowercase().contains(&self.key_signal)
            && !value.trim().is_empty()
    }
}
