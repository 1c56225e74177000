//! Role-gated access to per-department data partitions
//!
//! - **Role Matrix**: static mapping from a role to the role folders it must
//!   not see. Unknown roles resolve to an empty exclusion set.
//!
//! - **Access Filter**: walks a data root, applies the role matrix and an
//!   optional assignment, and returns the partitions the caller may query.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use registrar_core::access::{AccessAssignment, AccessFilter, Role, RoleMatrix};
//!
//! let filter = AccessFilter::new(Arc::new(RoleMatrix::school_defaults()));
//! let assignment = AccessAssignment::new(["bsit"]);
//! let partitions = filter.accessible_partitions(root, &Role::new("faculty"), assignment.as_ref())?;
//! ```

mod filter;
mod role;

pub use filter::{AccessAssignment, AccessFilter, DEFAULT_STORE_MARKERS, Partition};
pub use role::{GUEST_FOLDER, Role, RoleMatrix};
