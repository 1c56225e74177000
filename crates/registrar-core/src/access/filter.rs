//! Access filter: discovers the data partitions a role may query
//!
//! The filter walks a data root whose immediate subdirectories are role
//! folders. Folders named in the caller's exclusion set are never entered.
//! Within admitted folders, any directory holding a store marker file is a
//! partition. The shared guest folder is emitted at most once per call.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::role::{GUEST_FOLDER, Role, RoleMatrix};
use crate::error::{Error, Result};

/// Store marker files recognised when no explicit list is configured
pub const DEFAULT_STORE_MARKERS: &[&str] = &["chroma.sqlite3", "index.faiss", "docstore.json"];

/// A discovered, independently queryable data subset on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Absolute (or root-joined) path of the partition directory
    pub path: PathBuf,
    /// Path relative to the data root
    pub relative_path: PathBuf,
    /// Lower-cased name of the role folder that owns the partition
    pub role_folder: String,
    /// Whether this is the shared guest partition
    pub is_guest: bool,
}

impl Partition {
    /// Directory name of the partition
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Folder or partition names a caller opts into
///
/// Tokens are trimmed and lower-cased. A partition matches when any token is a
/// substring of its root-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAssignment {
    tokens: Vec<String>,
}

impl AccessAssignment {
    /// Build an assignment; returns `None` when no non-blank token remains
    pub fn new<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect();

        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn matches(&self, path: &Path) -> bool {
        let haystack = path.to_string_lossy().to_lowercase();
        self.tokens.iter().any(|t| haystack.contains(t.as_str()))
    }
}

/// Role-based partition filter
#[derive(Debug, Clone)]
pub struct AccessFilter {
    matrix: Arc<RoleMatrix>,
    store_markers: Vec<String>,
    diagnostics: bool,
}

/// Per-call traversal state
struct Walk<'a> {
    root: &'a Path,
    excluded: BTreeSet<Role>,
    assignment: Option<&'a AccessAssignment>,
    guest_included: bool,
    partitions: Vec<Partition>,
}

impl AccessFilter {
    /// Create a filter using the default store markers
    pub fn new(matrix: Arc<RoleMatrix>) -> Self {
        Self {
            matrix,
            store_markers: DEFAULT_STORE_MARKERS.iter().map(|m| m.to_string()).collect(),
            diagnostics: false,
        }
    }

    /// Replace the set of store marker file names
    pub fn with_store_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Log every skip/include decision at info level
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn matrix(&self) -> &RoleMatrix {
        &self.matrix
    }

    pub fn store_markers(&self) -> &[String] {
        &self.store_markers
    }

    /// List the partitions under `root` that `role` may query
    ///
    /// Results follow file-name order at every level of the walk. A missing
    /// root, or a permission failure anywhere in the walk, is an error rather
    /// than an empty list. A blank role is rejected; it would otherwise be
    /// unknown and therefore unrestricted.
    pub fn accessible_partitions(
        &self,
        root: &Path,
        role: &Role,
        assignment: Option<&AccessAssignment>,
    ) -> Result<Vec<Partition>> {
        if role.as_str().is_empty() {
            return Err(Error::InvalidInput("role must not be blank".to_string()));
        }

        let metadata = fs::metadata(root).map_err(|e| Error::from_io(e, root))?;
        if !metadata.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }

        let mut walk = Walk {
            root,
            excluded: self.matrix.exclusions(role),
            assignment,
            guest_included: false,
            partitions: Vec::new(),
        };

        for (name, path) in subdirectories(root)? {
            let folder = Role::new(&name);
            if walk.excluded.contains(&folder) {
                self.note("skip", &path, "folder excluded for role");
                continue;
            }

            if folder.is_guest() {
                self.visit_guest(&mut walk, path);
            } else {
                self.visit(&mut walk, &path, folder.as_str())?;
            }
        }

        debug!(
            role = %role,
            root = %root.display(),
            count = walk.partitions.len(),
            "Resolved accessible partitions"
        );

        Ok(walk.partitions)
    }

    fn visit(&self, walk: &mut Walk<'_>, dir: &Path, role_folder: &str) -> Result<()> {
        if self.has_store_marker(dir) {
            let relative_path = dir.strip_prefix(walk.root).unwrap_or(dir).to_path_buf();
            if let Some(assignment) = walk.assignment {
                if !assignment.matches(&relative_path) {
                    self.note("skip", dir, "not in assignment");
                    return Ok(());
                }
            }

            self.note("include", dir, "store marker present");
            walk.partitions.push(Partition {
                path: dir.to_path_buf(),
                relative_path,
                role_folder: role_folder.to_string(),
                is_guest: false,
            });
            return Ok(());
        }

        for (name, path) in subdirectories(dir)? {
            if Role::new(&name).is_guest() {
                self.visit_guest(walk, path);
            } else {
                self.visit(walk, &path, role_folder)?;
            }
        }
        Ok(())
    }

    fn visit_guest(&self, walk: &mut Walk<'_>, dir: PathBuf) {
        if walk.excluded.contains(&Role::new(GUEST_FOLDER)) {
            self.note("skip", &dir, "guest data excluded for role");
            return;
        }
        if walk.guest_included {
            self.note("skip", &dir, "guest folder already included");
            return;
        }

        self.note("include", &dir, "guest folder");
        let relative_path = dir.strip_prefix(walk.root).unwrap_or(dir.as_path()).to_path_buf();
        walk.guest_included = true;
        walk.partitions.push(Partition {
            path: dir,
            relative_path,
            role_folder: GUEST_FOLDER.to_string(),
            is_guest: true,
        });
    }

    fn has_store_marker(&self, dir: &Path) -> bool {
        self.store_markers.iter().any(|m| dir.join(m).is_file())
    }

    fn note(&self, decision: &str, path: &Path, reason: &str) {
        if self.diagnostics {
            info!(decision, path = %path.display(), reason, "Access decision");
        }
    }
}

/// Immediate subdirectories of `dir`, sorted by file name
///
/// Symbolic links are never followed; a linked directory could expose another
/// role's folder under an admitted name.
fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::from_io(e, dir))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::from_io(e, dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::from_io(e, &path))?;
        if file_type.is_symlink() {
            debug!(path = %path.display(), "Skipping symbolic link");
            continue;
        }
        if !file_type.is_dir() {
            continue;
        }
        dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
    }

    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}
