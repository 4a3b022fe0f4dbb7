//! Settings shared by the ragdoll library and the `nebula-ragdoll` tool.
//!
//! Stored as `config.ron` in the user's config directory. Command-line flags
//! override individual values for one run.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, default_config_dir};
pub use config::{CONFIG_FILE_NAME, Config, DebugConfig, EditorConfig, FallbackRagdoll, RagdollConfig};
pub use error::ConfigError;
