//! Query plans and delexicalized results

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::slot::{SlotKind, placeholder_spans};
use crate::error::{Error, Result};

/// Named parameters resolved by the upstream planner
///
/// Values are arbitrary JSON; only string values are ever generalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryPlan(Map<String, Value>);

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a plan from a JSON object
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| Error::InvalidPlan(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidPlan(format!("got {}", json_type(&other)))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for QueryPlan {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QueryPlan {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Template plus the plan with generalized fields replaced by placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelexicalizedResult {
    pub template: String,
    pub parameters: QueryPlan,
}

impl DelexicalizedResult {
    /// Key under which the external layer caches an execution plan
    pub fn cache_key(&self) -> &str {
        &self.template
    }

    /// Slot kinds that occur in the template
    pub fn slots(&self) -> BTreeSet<SlotKind> {
        placeholder_spans(&self.template)
            .into_iter()
            .filter_map(|r| SlotKind::from_placeholder(&self.template[r]))
            .collect()
    }

    /// Parameter keys whose values were generalized
    pub fn generalized_keys(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, v)| v.as_str().is_some_and(SlotKind::is_placeholder))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}
