//! CLI command handlers.

pub mod config;
pub mod console;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use attune_config::LoadedConfig;
use tracing::warn;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// User config directory override.
    pub config_dir: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Discover, merge and validate configuration.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = attune_config::load_config_with_options(None, self.config_dir.as_deref())?;
        for warning in &loaded.warnings {
            warn!("{}", warning);
        }
        Ok(loaded)
    }

    /// Path of the user config file.
    pub fn user_config_path(&self) -> Option<PathBuf> {
        match &self.config_dir {
            Some(dir) => Some(dir.join("config.toml")),
            None => attune_config::xdg_config_path(),
        }
    }
}
