//! Registrar Core Library
//!
//! This crate provides the access-scoped query template engine behind the
//! school-records query backend:
//! - Role-gated discovery of per-department data partitions
//! - Query delexicalization into reusable templates and parameter maps
//! - Template-keyed caching of execution plans
//! - Configuration with file persistence
//!
//! Unknown roles are not rejected here. A role missing from the role matrix
//! sees every partition, so upstream authentication must validate roles
//! before calling into this crate.

pub mod access;
pub mod cache;
pub mod config;
pub mod delex;
pub mod engine;
pub mod error;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::access::{AccessAssignment, AccessFilter, Partition, Role, RoleMatrix};
    pub use crate::config::Config;
    pub use crate::delex::{DelexicalizedResult, Delexicalizer, QueryPlan, SlotKind};
    pub use crate::engine::{PreparedQuery, QueryEngine, QueryRequest};
    pub use crate::error::{Error, Result};
}
