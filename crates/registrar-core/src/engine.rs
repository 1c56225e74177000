//! Query engine: access filtering, delexicalization, and plan caching
//!
//! The engine is built once at process start. The role matrix, the extractor
//! pipeline, and the name model are read-only afterwards; only the template
//! cache changes between calls.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::access::{AccessAssignment, AccessFilter, Partition, Role};
use crate::cache::{CachedPlan, TemplateCache, fill_slots, slot_bindings};
use crate::config::Config;
use crate::delex::{DelexicalizedResult, Delexicalizer, QueryPlan, load_name_model};
use crate::error::{Error, Result};

/// A caller's already-authenticated request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub role: Role,
    #[serde(default)]
    pub assignment: Option<AccessAssignment>,
    pub query: String,
    #[serde(default)]
    pub plan: QueryPlan,
}

impl QueryRequest {
    pub fn new(role: impl Into<Role>, query: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            assignment: None,
            query: query.into(),
            plan: QueryPlan::new(),
        }
    }

    pub fn with_assignment<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.assignment = AccessAssignment::new(tokens);
        self
    }

    pub fn with_plan(mut self, plan: QueryPlan) -> Self {
        self.plan = plan;
        self
    }
}

/// Everything the reasoning layer needs to answer a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedQuery {
    pub partitions: Vec<Partition>,
    pub delexicalized: DelexicalizedResult,
    /// Plan previously recorded for this template, if any
    pub cached: Option<CachedPlan>,
}

impl PreparedQuery {
    pub fn is_cache_hit(&self) -> bool {
        self.cached.is_some()
    }
}

/// Facade over the access filter, delexicalizer, and template cache
#[derive(Debug, Clone)]
pub struct QueryEngine {
    data_root: PathBuf,
    filter: Arc<AccessFilter>,
    delexicalizer: Arc<Delexicalizer>,
    cache: TemplateCache,
}

impl QueryEngine {
    pub fn new(
        data_root: impl Into<PathBuf>,
        filter: AccessFilter,
        delexicalizer: Delexicalizer,
        cache: TemplateCache,
    ) -> Self {
        Self {
            data_root: data_root.into(),
            filter: Arc::new(filter),
            delexicalizer: Arc::new(delexicalizer),
            cache,
        }
    }

    /// Build the engine from configuration, loading the name model once
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let filter = AccessFilter::new(Arc::new(config.access.role_matrix()))
            .with_store_markers(config.access.store_markers.iter().cloned())
            .with_diagnostics(config.access.diagnostics);

        let name_model = load_name_model(config.delex.name_model_path.as_deref());
        let delexicalizer = Delexicalizer::standard(
            &config.delex.programs,
            &config.delex.year_keys,
            name_model,
            &config.delex.name_key_signal,
        )?;

        info!(
            data_root = %config.access.data_root.display(),
            roles = config.access.roles.len(),
            programs = config.delex.programs.len(),
            "Query engine initialized"
        );

        Ok(Self::new(
            config.access.data_root.clone(),
            filter,
            delexicalizer,
            TemplateCache::new(config.cache.capacity),
        ))
    }

    pub fn data_root(&self) -> &std::path::Path {
        &self.data_root
    }

    pub fn filter(&self) -> &AccessFilter {
        &self.filter
    }

    pub fn delexicalizer(&self) -> &Delexicalizer {
        &self.delexicalizer
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Partitions under the data root visible to `role`
    pub fn accessible_partitions(
        &self,
        role: &Role,
        assignment: Option<&AccessAssignment>,
    ) -> Result<Vec<Partition>> {
        self.filter
            .accessible_partitions(&self.data_root, role, assignment)
    }

    pub fn delexicalize(&self, query: &str, plan: &QueryPlan) -> DelexicalizedResult {
        self.delexicalizer.delexicalize(query, plan)
    }

    /// Resolve partitions, delexicalize, and look up a cached plan
    #[instrument(skip(self, request), fields(role = %request.role))]
    pub fn prepare(&self, request: &QueryRequest) -> Result<PreparedQuery> {
        let partitions = self.accessible_partitions(&request.role, request.assignment.as_ref())?;
        let delexicalized = self.delexicalize(&request.query, &request.plan);
        let cached = self.cache.get(delexicalized.cache_key());

        Ok(PreparedQuery {
            partitions,
            delexicalized,
            cached,
        })
    }

    /// Run [`prepare`](Self::prepare) on the blocking thread pool
    pub async fn prepare_async(&self, request: QueryRequest) -> Result<PreparedQuery> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.prepare(&request))
            .await
            .map_err(|e| Error::TaskFailed(e.to_string()))?
    }

    /// Store the execution plan the reasoning layer produced for `template`
    pub fn record_plan(&self, template: &str, plan: Value) {
        self.cache.insert(template, plan);
    }

    /// Cached execution plan with the request's concrete values filled in
    ///
    /// Returns `None` on a cache miss.
    pub fn rehydrate(&self, prepared: &PreparedQuery, request: &QueryRequest) -> Option<Value> {
        let cached = prepared.cached.as_ref()?;
        let bindings = slot_bindings(&prepared.delexicalized.parameters, &request.plan);
        Some(fill_slots(&cached.plan, &bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, QueryEngine) {
        let temp = TempDir::new().unwrap();
        for rel in ["faculty/grades/bsit", "student/handbook", "guest"] {
            let dir = temp.path().join(rel);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("chroma.sqlite3"), b"").unwrap();
        }

        let mut config = Config::default();
        config.access.data_root = temp.path().to_path_buf();
        let engine = QueryEngine::from_config(&config).unwrap();
        (temp, engine)
    }

    #[test]
    fn test_prepare_and_cache_round_trip() {
        let (_temp, engine) = setup();
        let request = QueryRequest::new("Faculty", "How many 3rd year Nursing students?")
            .with_plan(QueryPlan::new().with("program", "Nursing").with("year_level", "3"));

        let first = engine.prepare(&request).unwrap();
        assert!(!first.is_cache_hit());
        assert_eq!(first.partitions.len(), 3);
        assert_eq!(
            first.delexicalized.template,
            "How many <YEAR_LEVEL> <PROGRAM> students?"
        );

        assert!(engine.rehydrate(&first, &request).is_none());

        let plan = json!({"op": "count", "filter": {"program": "<PROGRAM>", "year_level": "<YEAR_LEVEL>"}});
        engine.record_plan(first.delexicalized.cache_key(), plan.clone());

        let other = QueryRequest::new("faculty", "How many 1st year Psychology students?")
            .with_plan(QueryPlan::new().with("program", "Psychology").with("year_level", "1"));
        let second = engine.prepare(&other).unwrap();
        assert!(second.is_cache_hit());
        assert_eq!(second.cached.as_ref().unwrap().plan, plan);

        let concrete = engine.rehydrate(&second, &other).unwrap();
        assert_eq!(
            concrete,
            json!({"op": "count", "filter": {"program": "Psychology", "year_level": "1"}})
        );
        assert_ne!(concrete, serde_json::to_value(&other.plan).unwrap());
    }

    #[test]
    fn test_prepare_respects_role() {
        let (_temp, engine) = setup();
        let request = QueryRequest::new("student", "Show the handbook");
        let prepared = engine.prepare(&request).unwrap();

        let folders: Vec<&str> = prepared
            .partitions
            .iter()
            .map(|p| p.role_folder.as_str())
            .collect();
        assert_eq!(folders, vec!["guest", "student"]);
    }

    #[test]
    fn test_prepare_missing_root() {
        let (temp, _) = setup();
        let mut config = Config::default();
        config.access.data_root = temp.path().join("absent");
        let engine = QueryEngine::from_config(&config).unwrap();

        let err = engine
            .prepare(&QueryRequest::new("admin", "anything"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(matches!(
            QueryEngine::from_config(&config),
            Err(Error::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_prepare_async() {
        let (_temp, engine) = setup();
        let request = QueryRequest::new("admin", "List 2nd year students").with_assignment(["bsit"]);

        let prepared = engine.prepare_async(request).await.unwrap();
        assert_eq!(prepared.delexicalized.template, "List <YEAR_LEVEL> students");
        let names: Vec<String> = prepared.partitions.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["bsit", "guest"]);
    }
}
