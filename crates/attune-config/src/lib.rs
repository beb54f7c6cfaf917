//! Configuration system for Attune.
//!
//! Provides TOML-based configuration with:
//! - `[cache]`, `[focus]` and `[storage]` sections, all optional
//! - Config file layering (XDG user config + project-local overrides)
//! - Validation of duration bounds before the runtime is wired

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
    xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
