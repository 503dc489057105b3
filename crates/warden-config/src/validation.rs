// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as key derivation cost floors and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::WardenConfig;

/// Smallest Argon2id memory cost accepted, in KiB.
pub const MIN_KDF_MEMORY_COST: u32 = 8192;

/// Largest Argon2id memory cost accepted, in KiB (4 GiB).
pub const MAX_KDF_MEMORY_COST: u32 = 4_194_304;

/// Largest Argon2id iteration count accepted.
pub const MAX_KDF_ITERATIONS: u32 = 64;

/// Largest Argon2id lane count accepted.
pub const MAX_KDF_PARALLELISM: u32 = 16;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WardenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    let keystore = &config.keystore;

    if keystore.config_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "keystore.config_dir must not be empty".to_string(),
        });
    }

    if !(MIN_KDF_MEMORY_COST..=MAX_KDF_MEMORY_COST).contains(&keystore.kdf_memory_cost) {
        errors.push(ConfigError::Validation {
            message: format!(
                "keystore.kdf_memory_cost must be between {MIN_KDF_MEMORY_COST} (8 MiB) and {MAX_KDF_MEMORY_COST} (4 GiB), got {}",
                keystore.kdf_memory_cost
            ),
        });
    }

    if !(1..=MAX_KDF_ITERATIONS).contains(&keystore.kdf_iterations) {
        errors.push(ConfigError::Validation {
            message: format!(
                "keystore.kdf_iterations must be between 1 and {MAX_KDF_ITERATIONS}, got {}",
                keystore.kdf_iterations
            ),
        });
    }

    if keystore.kdf_parallelism < 1 || keystore.kdf_parallelism > MAX_KDF_PARALLELISM {
        errors.push(ConfigError::Validation {
            message: format!(
                "keystore.kdf_parallelism must be between 1 and {MAX_KDF_PARALLELISM}, got {}",
                keystore.kdf_parallelism
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = WardenConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_config_dir_fails_validation() {
        let mut config = WardenConfig::default();
        config.keystore.config_dir = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "config_dir"));
    }

    #[test]
    fn weak_kdf_parameters_fail_validation() {
        let mut config = WardenConfig::default();
        config.keystore.kdf_memory_cost = 1024;
        config.keystore.kdf_iterations = 0;
        config.keystore.kdf_parallelism = 64;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "all violations are collected");
        assert!(has_message(&errors, "kdf_memory_cost"));
        assert!(has_message(&errors, "kdf_iterations"));
        assert!(has_message(&errors, "kdf_parallelism"));
    }

    #[test]
    fn oversized_kdf_parameters_fail_validation() {
        let mut config = WardenConfig::default();
        config.keystore.kdf_memory_cost = MAX_KDF_MEMORY_COST + 1;
        config.keystore.kdf_iterations = MAX_KDF_ITERATIONS + 1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_message(&errors, "kdf_memory_cost"));
        assert!(has_message(&errors, "kdf_iterations"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = WardenConfig::default();
        config.log.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "log.level"));
    }
}
