//! Shared capability of every entity extractor

use regex::Regex;

use super::slot::{SlotKind, placeholder_spans, touches_any};

/// A recognizer that finds entities of one kind and replaces them with the
/// kind's placeholder
///
/// Extractors must leave existing placeholder tokens untouched so that
/// delexicalizing a template a second time changes nothing.
pub trait EntityExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Slot kind this extractor generalizes
    fn kind(&self) -> SlotKind;

    /// Whether the extractor can run at all
    fn is_enabled(&self) -> bool {
        true
    }

    /// Rewrite `text`, replacing recognized spans with the placeholder
    fn generalize_text(&self, text: &str) -> String;

    /// Whether the plan parameter `key` holding `value` belongs to this kind
    fn generalizes_param(&self, key: &str, value: &str) -> bool;

    fn placeholder(&self) -> &'static str {
        self.kind().placeholder()
    }
}

/// Replace every match of `pattern` in `text` with `placeholder`, skipping
/// matches that overlap or abut an existing placeholder token
pub(crate) fn replace_matches(text: &str, pattern: &Regex, placeholder: &str) -> String {
    let protected = placeholder_spans(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in pattern.find_iter(text) {
        if touches_any(&m.range(), &protected) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(placeholder);
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}
