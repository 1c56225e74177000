//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::access::{DEFAULT_STORE_MARKERS, RoleMatrix};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::delex::{DEFAULT_NAME_KEY_SIGNAL, DEFAULT_YEAR_KEYS};

/// Registrar configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub access: AccessConfig,
    pub delex: DelexConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Directory whose subfolders are role folders
    pub data_root: PathBuf,
    /// File names that mark a directory as a queryable partition
    pub store_markers: Vec<String>,
    /// Log every skip/include decision
    pub diagnostics: bool,
    /// Role -> role folders it must not see
    pub roles: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelexConfig {
    /// Known program names
    pub programs: Vec<String>,
    /// Plan keys holding year levels
    pub year_keys: Vec<String>,
    /// Plan keys containing this substring hold person names
    pub name_key_signal: String,
    /// Person-name model file; stage 3 is disabled when unset or unreadable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access: AccessConfig::default(),
            delex: DelexConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        let roles = RoleMatrix::school_defaults()
            .iter()
            .map(|(role, excluded)| {
                (
                    role.to_string(),
                    excluded.iter().map(|r| r.to_string()).collect(),
                )
            })
            .collect();

        Self {
            data_root: PathBuf::from("./data"),
            store_markers: DEFAULT_STORE_MARKERS.iter().map(|m| m.to_string()).collect(),
            diagnostics: false,
            roles,
        }
    }
}

impl Default for DelexConfig {
    fn default() -> Self {
        Self {
            programs: [
                "Computer Science",
                "Information Technology",
                "Information Systems",
                "Nursing",
                "Civil Engineering",
                "Business Administration",
                "Psychology",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            year_keys: DEFAULT_YEAR_KEYS.iter().map(|k| k.to_string()).collect(),
            name_key_signal: DEFAULT_NAME_KEY_SIGNAL.to_string(),
            name_model_path: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl AccessConfig {
    /// Build the role matrix from the configured exclusions
    pub fn role_matrix(&self) -> RoleMatrix {
        RoleMatrix::from_entries(self.roles.iter())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("Invalid boolean value: {}. Use true or false.", value)),
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("REGISTRAR_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("registrar")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or defaults if it doesn't exist
    ///
    /// `REGISTRAR_DATA_ROOT` overrides `access.data_root`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;

        if let Ok(root) = env::var("REGISTRAR_DATA_ROOT") {
            if !root.trim().is_empty() {
                config.access.data_root = PathBuf::from(root);
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default file
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.access.store_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(anyhow!("access.store_markers must name at least one file"));
        }
        if self.cache.capacity == 0 {
            return Err(anyhow!("cache.capacity must be greater than zero"));
        }
        if self.access.roles.keys().any(|r| r.trim().is_empty()) {
            return Err(anyhow!("access.roles contains an empty role name"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        if let Some(role) = key.strip_prefix("access.roles.") {
            let role = role.to_lowercase();
            return self
                .access
                .roles
                .iter()
                .find(|(r, _)| r.to_lowercase() == role)
                .map(|(_, excluded)| excluded.join(", "))
                .ok_or_else(|| anyhow!("Role '{}' is not configured", role));
        }

        match key {
            // Access settings
            "access.data_root" => Ok(self.access.data_root.display().to_string()),
            "access.store_markers" => Ok(self.access.store_markers.join(", ")),
            "access.diagnostics" => Ok(self.access.diagnostics.to_string()),

            // Delexicalization settings
            "delex.programs" => Ok(self.delex.programs.join(", ")),
            "delex.year_keys" => Ok(self.delex.year_keys.join(", ")),
            "delex.name_key_signal" => Ok(self.delex.name_key_signal.clone()),
            "delex.name_model_path" => Ok(match &self.delex.name_model_path {
                Some(path) => path.display().to_string(),
                None => "(not set - person-name generalization disabled)".to_string(),
            }),

            // Cache settings
            "cache.capacity" => Ok(self.cache.capacity.to_string()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `registrar config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if let Some(role) = key.strip_prefix("access.roles.") {
            let role = role.trim().to_lowercase();
            if role.is_empty() {
                return Err(anyhow!("Role name must not be empty"));
            }
            self.access.roles.retain(|r, _| r.to_lowercase() != role);
            self.access
                .roles
                .insert(role, split_list(value).into_iter().map(|r| r.to_lowercase()).collect());
            return Ok(());
        }

        match key {
            // Access settings
            "access.data_root" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Data root must not be empty"));
                }
                self.access.data_root = PathBuf::from(value);
            }
            "access.store_markers" => {
                let markers = split_list(value);
                if markers.is_empty() {
                    return Err(anyhow!("At least one store marker is required"));
                }
                self.access.store_markers = markers;
            }
            "access.diagnostics" => {
                self.access.diagnostics = parse_bool(value)?;
            }

            // Delexicalization settings
            "delex.programs" => {
                self.delex.programs = split_list(value);
            }
            "delex.year_keys" => {
                self.delex.year_keys = split_list(value);
            }
            "delex.name_key_signal" => {
                self.delex.name_key_signal = value.trim().to_lowercase();
            }
            "delex.name_model_path" => {
                self.delex.name_model_path = if value.trim().is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }

            // Cache settings
            "cache.capacity" => {
                let capacity: usize = value
                    .parse()
                    .with_context(|| format!("Invalid capacity value: {}", value))?;
                if capacity == 0 {
                    return Err(anyhow!("Cache capacity must be greater than zero"));
                }
                self.cache.capacity = capacity;
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `registrar config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let mut keys: Vec<String> = [
            "access.data_root",
            "access.store_markers",
            "access.diagnostics",
            "delex.programs",
            "delex.year_keys",
            "delex.name_key_signal",
            "delex.name_model_path",
            "cache.capacity",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        keys.extend(self.access.roles.keys().map(|r| format!("access.roles.{}", r)));

        keys.into_iter()
            .map(|key| {
                let value = self.get(&key)?;
                Ok((key, value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
