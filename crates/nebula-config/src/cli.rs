//! Command-line overrides for a single run of a ragdoll tool.

use std::path::PathBuf;

use clap::Args;

use crate::Config;

/// Flags that take precedence over `config.ron`. Flattened into each tool's
/// own parser; every flag is global so it may follow the subcommand.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    /// Content root that relative ragdoll paths resolve against.
    #[arg(long, global = true, value_name = "DIR")]
    pub content_root: Option<PathBuf>,

    /// Load sprites, deformations and lights.
    #[arg(long, global = true, value_name = "BOOL")]
    pub visuals: Option<bool>,

    /// Reject joints that reference missing limbs.
    #[arg(long, global = true, value_name = "BOOL")]
    pub validate_joints: Option<bool>,

    /// Maximum number of undo snapshots, 0 for no limit.
    #[arg(long, global = true)]
    pub undo_depth: Option<usize>,

    /// Indentation width of saved ragdoll files.
    #[arg(long, global = true)]
    pub indent: Option<usize>,

    /// `tracing` filter, e.g. `warn` or `info,nebula_ragdoll=debug`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Directory holding `config.ron`.
    #[arg(long, global = true, value_name = "DIR")]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Overwrites every setting `args` names.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let ragdoll = &mut self.ragdoll;
        if let Some(root) = &args.content_root {
            ragdoll.content_root.clone_from(root);
        }
        ragdoll.load_visuals = args.visuals.unwrap_or(ragdoll.load_visuals);
        ragdoll.validate_joints = args.validate_joints.unwrap_or(ragdoll.validate_joints);

        self.editor.undo_depth = args.undo_depth.unwrap_or(self.editor.undo_depth);
        self.editor.indent = args.indent.unwrap_or(self.editor.indent);
        if let Some(level) = &args.log_level {
            self.debug.log_level.clone_from(level);
        }
    }
}

/// `<platform config dir>/nebula-ragdoll`, or `./nebula-ragdoll` on
/// platforms without one.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nebula-ragdoll")
}
