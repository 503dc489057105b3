// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Warden configuration system.

use figment::Jail;
use warden_config::diagnostic::ConfigError;
use warden_config::model::WardenConfig;
use warden_config::{load_and_validate_path, load_and_validate_str, load_config, load_config_from_str};
use warden_core::InstallType;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_warden_config() {
    let toml = r#"
[log]
level = "debug"

[keystore]
config_dir = "/etc/warden"
install_type = "package"
kdf_memory_cost = 32768
kdf_iterations = 2
kdf_parallelism = 1
owner_uid = 0
owner_gid = 991
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.keystore.config_dir, "/etc/warden");
    assert_eq!(config.keystore.install_type, InstallType::Package);
    assert_eq!(config.keystore.kdf_memory_cost, 32768);
    assert_eq!(config.keystore.kdf_iterations, 2);
    assert_eq!(config.keystore.kdf_parallelism, 1);
    assert_eq!(config.keystore.owner_uid, Some(0));
    assert_eq!(config.keystore.owner_gid, Some(991));
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.log.level, "info");
    assert_eq!(config.keystore.install_type, InstallType::Archive);
    assert_eq!(config.keystore.kdf_memory_cost, 65536);
    assert_eq!(config.keystore.kdf_iterations, 3);
    assert_eq!(config.keystore.kdf_parallelism, 4);
    assert!(config.keystore.owner_uid.is_none());
    assert!(!config.keystore.config_dir.is_empty());
}

#[test]
fn unknown_field_in_keystore_produces_error() {
    let toml = r#"
[keystore]
confg_dir = "/tmp"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("confg_dir"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

#[test]
fn deny_unknown_fields_at_top_level() {
    let result = load_config_from_str("[vault]\nkey = 1\n");
    assert!(result.is_err());
}

#[test]
fn unknown_install_type_is_rejected() {
    let result = load_config_from_str("[keystore]\ninstall_type = \"docker\"\n");
    assert!(result.is_err());
}

#[test]
fn diagnostic_suggests_correct_key() {
    let errors = load_and_validate_str("[keystore]\nconfg_dir = \"/tmp\"\n")
        .expect_err("should produce diagnostics");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "keystore.confg_dir" && s == "config_dir"
        )),
        "expected an unknown-key diagnostic with a suggestion, got: {errors:?}"
    );
}

#[test]
fn diagnostic_invalid_type_message() {
    let errors = load_and_validate_str("[keystore]\nkdf_iterations = \"three\"\n")
        .expect_err("should produce diagnostics");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key == "keystore.kdf_iterations")),
        "expected an invalid-type diagnostic, got: {errors:?}"
    );
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "keystore.confg_dir".into(),
        suggestion: Some("config_dir".into()),
        valid_keys: "config_dir, install_type".into(),
    };
    assert!(error.code().is_some());

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error as &dyn Diagnostic)
        .expect("should render");
    assert!(buf.contains("confg_dir"));
    assert!(buf.contains("did you mean"));
}

#[test]
fn validation_runs_after_deserialization() {
    let errors = load_and_validate_str("[keystore]\nkdf_memory_cost = 16\n")
        .expect_err("weak KDF should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("kdf_memory_cost"))));
}

#[test]
fn load_and_validate_path_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let errors = load_and_validate_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(&errors[0], ConfigError::Other(m) if m.contains("not found")));
}

#[test]
fn local_file_and_env_vars_layer_in_order() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "warden.toml",
            r#"
[log]
level = "warn"

[keystore]
config_dir = "from-file"
kdf_iterations = 5
"#,
        )?;
        jail.set_env("WARDEN_KEYSTORE_CONFIG_DIR", "from-env");
        jail.set_env("WARDEN_LOG_LEVEL", "debug");

        let config = load_config()?;
        assert_eq!(config.keystore.config_dir, "from-env");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.keystore.kdf_iterations, 5);
        Ok(())
    });
}

#[test]
fn env_var_maps_underscored_key_names() {
    Jail::expect_with(|jail| {
        jail.set_env("WARDEN_KEYSTORE_KDF_MEMORY_COST", "16384");
        let config = load_config()?;
        assert_eq!(config.keystore.kdf_memory_cost, 16384);
        Ok(())
    });
}

#[test]
fn passphrase_file_variable_is_not_treated_as_config() {
    Jail::expect_with(|jail| {
        jail.set_env("WARDEN_KEYSTORE_PASSPHRASE_FILE", "/run/secrets/warden");
        let config: WardenConfig = load_config()?;
        assert_eq!(config.keystore.kdf_iterations, 3);
        Ok(())
    });
}
