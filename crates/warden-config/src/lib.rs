// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Warden keystore.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use warden_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Keystore directory: {}", config.keystore.config_dir);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{into_warden_error, render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str, PASSPHRASE_FILE_ENV_VAR};
pub use model::{KeystoreConfig, WardenConfig};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `WardenConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<WardenConfig, Vec<ConfigError>> {
    finish(loader::load_config())
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<WardenConfig, Vec<ConfigError>> {
    if !path.exists() {
        return Err(vec![ConfigError::Other(format!(
            "config file not found: {}",
            path.display()
        ))]);
    }
    finish(loader::load_config_from_path(path))
}

/// Load configuration from a specific TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<WardenConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content))
}

fn finish(
    loaded: Result<WardenConfig, figment::Error>,
) -> Result<WardenConfig, Vec<ConfigError>> {
    let config = loaded.map_err(diagnostic::figment_to_config_errors)?;
    validation::validate_config(&config)?;
    Ok(config)
}
