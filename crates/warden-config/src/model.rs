// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Warden keystore.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use warden_core::InstallType;

/// Top-level Warden configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Keystore location, layout, and key derivation settings.
    #[serde(default)]
    pub keystore: KeystoreConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Keystore configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeystoreConfig {
    /// Directory holding `warden.keystore`.
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    /// Installation layout; only archive installs create a keystore at startup.
    #[serde(default)]
    pub install_type: InstallType,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,

    /// Numeric owner applied to the keystore file on save (unix only).
    #[serde(default)]
    pub owner_uid: Option<u32>,

    /// Numeric group applied to the keystore file on save (unix only).
    #[serde(default)]
    pub owner_gid: Option<u32>,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            install_type: InstallType::default(),
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
            owner_uid: None,
            owner_gid: None,
        }
    }
}

fn default_config_dir() -> String {
    dirs::config_dir()
        .map(|d| d.join("warden").display().to_string())
        .unwrap_or_else(|| "config".to_string())
}

fn default_kdf_memory_cost() -> u32 {
    65536 // 64 MiB per OWASP recommendation
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}
