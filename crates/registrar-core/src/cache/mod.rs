//! Template-keyed plan cache
//!
//! Execution plans produced by the external reasoning layer are stored under
//! the delexicalized template. A later query that delexicalizes to the same
//! template reuses the plan. [`slot_bindings`] collects the new request's
//! concrete values per placeholder and [`fill_slots`] writes them back into
//! the cached plan.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::delex::{QueryPlan, SlotKind};

/// Default number of templates kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// A cached execution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPlan {
    pub template: String,
    pub plan: Value,
    pub cached_at: DateTime<Utc>,
    pub hits: u64,
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry {
    cached: CachedPlan,
    seq: u64,
}

struct Inner {
    capacity: usize,
    entries: RwLock<HashMap<String, Entry>>,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Shared, bounded cache of execution plans keyed by template
///
/// Cloning is cheap; clones share the same storage. When full, the entry
/// written least recently is evicted.
#[derive(Clone)]
pub struct TemplateCache {
    inner: Arc<Inner>,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                entries: RwLock::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Look up the plan cached for `template`
    pub fn get(&self, template: &str) -> Option<CachedPlan> {
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match entries.get_mut(template) {
            Some(entry) => {
                entry.cached.hits += 1;
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                debug!(template = %template, "Template cache hit");
                Some(entry.cached.clone())
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                debug!(template = %template, "Template cache miss");
                None
            }
        }
    }

    /// Store `plan` under `template`, replacing any previous entry
    pub fn insert(&self, template: impl Into<String>, plan: Value) {
        let template = template.into();
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !entries.contains_key(&template) && entries.len() >= self.inner.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!(template = %oldest, "Evicted template from cache");
            }
        }

        entries.insert(
            template.clone(),
            Entry {
                cached: CachedPlan {
                    template,
                    plan,
                    cached_at: Utc::now(),
                    hits: 0,
                },
                seq,
            },
        );
    }

    pub fn remove(&self, template: &str) -> Option<CachedPlan> {
        self.inner
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(template)
            .map(|e| e.cached)
    }

    pub fn clear(&self) {
        self.inner
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("capacity", &self.inner.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Restore concrete values into a generalized plan
///
/// Every key of `generalized` holding a placeholder takes the value stored
/// under the same key in `original`. Keys missing from `original` keep the
/// placeholder; other keys pass through.
pub fn rehydrate(generalized: &QueryPlan, original: &QueryPlan) -> QueryPlan {
    generalized
        .iter()
        .map(|(key, value)| {
            let is_slot = value.as_str().is_some_and(SlotKind::is_placeholder);
            let restored = match original.get(key) {
                Some(concrete) if is_slot => concrete.clone(),
                _ => value.clone(),
            };
            (key.clone(), restored)
        })
        .collect()
}

/// Concrete value bound to each placeholder kind for one request
///
/// A key of `generalized` holding a placeholder binds that placeholder to the
/// value under the same key in `original`. When several keys share a kind
/// the first key in plan order wins; same-kind entities are not told apart.
pub fn slot_bindings(generalized: &QueryPlan, original: &QueryPlan) -> BTreeMap<SlotKind, Value> {
    let mut bindings = BTreeMap::new();
    for (key, value) in generalized.iter() {
        let Some(kind) = value.as_str().and_then(SlotKind::from_placeholder) else {
            continue;
        };
        if let Some(concrete) = original.get(key) {
            bindings.entry(kind).or_insert_with(|| concrete.clone());
        }
    }
    bindings
}

/// Substitute bound values for placeholders anywhere inside a cached plan
///
/// A string that is exactly a placeholder is replaced by the bound value,
/// keeping its JSON type. A placeholder embedded in a longer string is
/// replaced textually when the bound value is a string, number, or boolean.
/// Unbound placeholders are left in place.
pub fn fill_slots(plan: &Value, bindings: &BTreeMap<SlotKind, Value>) -> Value {
    match plan {
        Value::String(text) => {
            if let Some(bound) = SlotKind::from_placeholder(text).and_then(|k| bindings.get(&k)) {
                return bound.clone();
            }
            let mut filled = text.clone();
            for (kind, bound) in bindings {
                let bound = match bound {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                filled = filled.replace(kind.placeholder(), &bound);
            }
            Value::String(filled)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| fill_slots(v, bindings)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), fill_slots(v, bindings)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hit_and_miss_counting() {
        let cache = TemplateCache::new(4);
        assert!(cache.get("How many <PROGRAM> students?").is_none());

        cache.insert("How many <PROGRAM> students?", json!({"sql": "SELECT 1"}));
        let cached = cache.get("How many <PROGRAM> students?").unwrap();
        assert_eq!(cached.plan, json!({"sql": "SELECT 1"}));
        assert_eq!(cached.hits, 1);

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { entries: 1, hits: 1, misses: 1 });
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_evicts_oldest() {
        let cache = TemplateCache::new(2);
        cache.insert("a", json!(1));
        cache.insert("b", json!(2));
        cache.insert("a", json!(3));
        assert_eq!(cache.len(), 2);

        cache.insert("c", json!(4));
        assert_eq!(cache.len(), 2);
        // Re-inserting "a" refreshed it, so "b" was the oldest
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = TemplateCache::default();
        let other = cache.clone();
        other.insert("t", json!(null));
        assert_eq!(cache.len(), 1);
        assert!(cache.remove("t").is_some());
        assert!(other.is_empty());

        cache.insert("u", json!(null));
        cache.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn test_rehydrate() {
        let original = QueryPlan::new()
            .with("program", "Nursing")
            .with("year_level", "3")
            .with("limit", 5);
        let generalized = QueryPlan::new()
            .with("program", "<PROGRAM>")
            .with("year_level", "<YEAR_LEVEL>")
            .with("student_name", "<PERSON>")
            .with("limit", 5);

        let restored = rehydrate(&generalized, &original);
        assert_eq!(restored.get_str("program"), Some("Nursing"));
        assert_eq!(restored.get_str("year_level"), Some("3"));
        assert_eq!(restored.get_str("student_name"), Some("<PERSON>"));
        assert_eq!(restored.get("limit"), Some(&json!(5)));
    }

    #[test]
    fn test_fill_slots_walks_nested_plan() {
        let original = QueryPlan::new()
            .with("program", "Psychology")
            .with("year_level", 1)
            .with("student_name", "Maria Santos");
        let generalized = QueryPlan::new()
            .with("program", "<PROGRAM>")
            .with("year_level", "<YEAR_LEVEL>")
            .with("student_name", "<PERSON>");
        let bindings = slot_bindings(&generalized, &original);
        assert_eq!(bindings.len(), 3);

        let cached = json!({
            "op": "count",
            "filter": {"program": "<PROGRAM>", "year": "<YEAR_LEVEL>"},
            "sql": "SELECT * FROM grades WHERE student = '<PERSON>' AND year = <YEAR_LEVEL>",
            "columns": ["<PROGRAM>", 7, null],
        });
        let filled = fill_slots(&cached, &bindings);
        assert_eq!(
            filled,
            json!({
                "op": "count",
                "filter": {"program": "Psychology", "year": 1},
                "sql": "SELECT * FROM grades WHERE student = 'Maria Santos' AND year = 1",
                "columns": ["Psychology", 7, null],
            })
        );
    }

    #[test]
    fn test_unbound_placeholders_stay() {
        let bindings = slot_bindings(
            &QueryPlan::new().with("program", "<PROGRAM>"),
            &QueryPlan::new(),
        );
        assert!(bindings.is_empty());

        let cached = json!({"program": "<PROGRAM>"});
        assert_eq!(fill_slots(&cached, &bindings), cached);
    }
}
