//! Settings for ragdoll resolution and editing, persisted as `config.ron`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level ragdoll tooling configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Ragdoll resolution and loading settings.
    pub ragdoll: RagdollConfig,
    /// Editing session settings.
    pub editor: EditorConfig,
    /// Logging settings.
    pub debug: DebugConfig,
}

/// A ragdoll file used when a species' own ragdoll cannot be resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackRagdoll {
    /// Species the fallback document is cached under.
    pub species: String,
    /// Ragdoll file, relative to the content root.
    pub path: PathBuf,
}

/// Ragdoll resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagdollConfig {
    /// Directory content-relative paths resolve against.
    pub content_root: PathBuf,
    /// Used by humanoid species whose ragdoll fails to resolve.
    pub humanoid_fallback: FallbackRagdoll,
    /// Used by every other species whose ragdoll fails to resolve.
    pub creature_fallback: FallbackRagdoll,
    /// Instantiate visual-only nodes (sprites, deformations, lights).
    pub load_visuals: bool,
    /// Reject joints that reference missing limbs when loading.
    pub validate_joints: bool,
}

/// Editing session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo snapshots (0 = unlimited).
    pub undo_depth: usize,
    /// Indentation width of saved ragdoll files.
    pub indent: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

// --- Defaults ---

impl FallbackRagdoll {
    pub fn humanoid() -> Self {
        Self {
            species: "human".to_string(),
            path: PathBuf::from("Content/Characters/Human/Ragdolls/HumanDefaultRagdoll.xml"),
        }
    }

    pub fn creature() -> Self {
        Self {
            species: "crawler".to_string(),
            path: PathBuf::from("Content/Characters/Crawler/Ragdolls/CrawlerDefaultRagdoll.xml"),
        }
    }
}

impl Default for FallbackRagdoll {
    fn default() -> Self {
        Self::humanoid()
    }
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("."),
            humanoid_fallback: FallbackRagdoll::humanoid(),
            creature_fallback: FallbackRagdoll::creature(),
            load_visuals: true,
            validate_joints: true,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_depth: 100,
            indent: 2,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Persistence ---

/// File name of the settings file inside a config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

impl Config {
    /// Path of the settings file in `config_dir`.
    pub fn path_in(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    /// Reads `config.ron` from `config_dir`. A missing file is replaced by
    /// the defaults, which are written back so users have something to edit.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(config_dir);
        if !path.exists() {
            let defaults = Self::default();
            defaults.save(config_dir)?;
            log::info!("Wrote default ragdoll settings to {}", path.display());
            return Ok(defaults);
        }
        let config = Self::read(&path)?;
        log::info!("Ragdoll settings read from {}", path.display());
        Ok(config)
    }

    /// Parses a settings file.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes `config.ron` into `config_dir`, creating the directory first.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path_in(config_dir);
        let text = ron::ser::to_string_pretty(self, pretty_config())
            .map_err(ConfigError::Serialize)?;
        fs::create_dir_all(config_dir)
            .and_then(|()| fs::write(&path, text))
            .map_err(|source| ConfigError::Write { path, source })
    }

    /// Re-reads the settings file. `Some` only when it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&Self::path_in(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Ragdoll settings changed on disk");
        Ok(Some(fresh))
    }
}

fn pretty_config() -> ron::ser::PrettyConfig {
    ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .separate_tuple_members(true)
        .enumerate_arrays(false)
}
