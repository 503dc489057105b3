// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./warden.toml` > `~/.config/warden/warden.toml` > `/etc/warden/warden.toml`
//! with environment variable overrides via `WARDEN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WardenConfig;

/// Environment variable naming the keystore passphrase file.
///
/// Consumed by the passphrase resolver, never by the config loader.
pub const PASSPHRASE_FILE_ENV_VAR: &str = "WARDEN_KEYSTORE_PASSPHRASE_FILE";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/warden/warden.toml` (system-wide)
/// 3. `~/.config/warden/warden.toml` (user XDG config)
/// 4. `./warden.toml` (local directory)
/// 5. `WARDEN_*` environment variables
pub fn load_config() -> Result<WardenConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WardenConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WardenConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WardenConfig::default()))
        .merge(Toml::file("/etc/warden/warden.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("warden/warden.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("warden.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `WARDEN_KEYSTORE_KDF_MEMORY_COST` must map to
/// `keystore.kdf_memory_cost`, not `keystore.kdf.memory.cost`. The passphrase
/// file variable shares the prefix and is filtered out here.
fn env_provider() -> Env {
    Env::prefixed("WARDEN_")
        .filter(|key| !key.as_str().eq_ignore_ascii_case("keystore_passphrase_file"))
        .map(|key| {
            let mapped = key
                .as_str()
                .to_ascii_lowercase()
                .replacen("log_", "log.", 1)
                .replacen("keystore_", "keystore.", 1);
            mapped.into()
        })
}
