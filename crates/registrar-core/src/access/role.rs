//! Role matrix: which roles' data each role must not see

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Case-insensitive role label, stored lower-cased
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Role(String);

impl Role {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(label.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this role names the shared guest area
    pub fn is_guest(&self) -> bool {
        self.0 == GUEST_FOLDER
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Folder name that holds data visible to every role not excluded from it
pub const GUEST_FOLDER: &str = "guest";

/// Mapping from a role to the set of role folders it must not see
///
/// The matrix does not validate roles. A role with no entry resolves to an
/// empty exclusion set and therefore sees every folder, so callers must reject
/// unrecognised roles before consulting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMatrix {
    exclusions: BTreeMap<Role, BTreeSet<Role>>,
}

impl RoleMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matrix from raw role labels, normalising every label
    pub fn from_entries<I, R, E, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (R, E)>,
        R: AsRef<str>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matrix = Self::new();
        for (role, excluded) in entries {
            matrix = matrix.with_exclusions(role, excluded);
        }
        matrix
    }

    /// Add exclusions for a role, merging with any already present
    pub fn with_exclusions<R, E, S>(mut self, role: R, excluded: E) -> Self
    where
        R: AsRef<str>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.exclusions.entry(Role::new(role)).or_default();
        entry.extend(
            excluded
                .into_iter()
                .map(Role::new)
                .filter(|r| !r.as_str().is_empty()),
        );
        self
    }

    /// Whether the role has an entry in the matrix
    pub fn is_known(&self, role: &Role) -> bool {
        self.exclusions.contains_key(role)
    }

    /// Exclusion set for a role; empty for unknown roles
    pub fn exclusions(&self, role: &Role) -> BTreeSet<Role> {
        match self.exclusions.get(role) {
            Some(set) => set.clone(),
            None => {
                warn!(
                    role = %role,
                    "Role is not in the role matrix and is treated as unrestricted; validate roles upstream"
                );
                BTreeSet::new()
            }
        }
    }

    /// Whether `role` is barred from the folder named `folder`
    pub fn excludes(&self, role: &Role, folder: &str) -> bool {
        let folder = Role::new(folder);
        self.exclusions
            .get(role)
            .is_some_and(|set| set.contains(&folder))
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.exclusions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Role, &BTreeSet<Role>)> {
        self.exclusions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.exclusions.is_empty()
    }

    /// Default school deployment: admin sees everything, guests only guest data
    pub fn school_defaults() -> Self {
        Self::new()
            .with_exclusions("admin", Vec::<&str>::new())
            .with_exclusions("faculty", ["admin"])
            .with_exclusions("staff", ["admin", "faculty"])
            .with_exclusions("student", ["admin", "faculty", "staff"])
            .with_exclusions("guest", ["admin", "faculty", "staff", "student"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_lowercased() {
        let role = Role::new("  Faculty ");
        assert_eq!(role.as_str(), "faculty");
        assert_eq!(role, Role::from("FACULTY"));
        assert!(Role::new("GUEST").is_guest());
    }

    #[test]
    fn test_exclusions_are_normalised() {
        let matrix = RoleMatrix::from_entries([("Student", vec!["Admin", "FACULTY", ""])]);
        let set = matrix.exclusions(&Role::new("student"));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Role::new("admin")));
        assert!(matrix.excludes(&Role::new("STUDENT"), "Faculty"));
        assert!(!matrix.excludes(&Role::new("student"), "guest"));
    }

    #[test]
    fn test_unknown_role_is_unrestricted() {
        let matrix = RoleMatrix::school_defaults();
        let intruder = Role::new("janitor");
        assert!(!matrix.is_known(&intruder));
        assert!(matrix.exclusions(&intruder).is_empty());
        assert!(!matrix.excludes(&intruder, "admin"));
    }

    #[test]
    fn test_with_exclusions_merges() {
        let matrix = RoleMatrix::new()
            .with_exclusions("staff", ["admin"])
            .with_exclusions("staff", ["faculty"]);
        assert_eq!(matrix.exclusions(&Role::new("staff")).len(), 2);
    }

    #[test]
    fn test_school_defaults() {
        let matrix = RoleMatrix::school_defaults();
        assert!(matrix.is_known(&Role::new("admin")));
        assert!(matrix.exclusions(&Role::new("admin")).is_empty());
        assert!(matrix.excludes(&Role::new("guest"), "student"));
        assert_eq!(matrix.roles().count(), 5);
    }
}
