// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end keystore behavior through the public API.

use std::fs;
use std::io::Write;

use proptest::prelude::*;
use secrecy::ExposeSecret;
use serial_test::serial;
use tempfile::tempdir;
use tracing_test::traced_test;
use warden_config::{KeystoreConfig, PASSPHRASE_FILE_ENV_VAR};
use warden_core::{InstallType, Passphrase, StartupMode, WardenError};
use warden_keystore::{bootstrap, KdfParams, Keystore, ScriptedTerminal, SEED_SETTING};

const FAST: KdfParams = KdfParams::Argon2id {
    memory_cost: 8192,
    iterations: 1,
    parallelism: 1,
};

fn pass(s: &str) -> Passphrase {
    Passphrase::from_string(s.to_string())
}

#[test]
fn unprotected_store_lists_sorted_names() {
    let dir = tempdir().unwrap();
    let mut keystore = Keystore::create_with_seed(FAST).unwrap();
    keystore.set_string("db.password", "secret123").unwrap();
    keystore.save(dir.path(), &Passphrase::empty()).unwrap();

    let mut loaded = Keystore::load_existing(dir.path()).unwrap();
    assert!(!loaded.has_password());
    loaded.decrypt(&Passphrase::empty()).unwrap();
    assert_eq!(
        loaded.setting_names().unwrap(),
        vec!["db.password".to_string(), SEED_SETTING.to_string()]
    );
}

#[test]
fn protected_store_rejects_wrong_password() {
    let dir = tempdir().unwrap();
    let mut keystore = Keystore::create(FAST).unwrap();
    keystore.set_string("db.password", "secret123").unwrap();
    keystore.set_file("tls.p12", b"\x00\x01binary").unwrap();
    keystore.save(dir.path(), &pass("p@ss")).unwrap();

    let mut loaded = Keystore::load_existing(dir.path()).unwrap();
    assert!(loaded.has_password());
    let err = loaded.decrypt(&pass("wrong")).unwrap_err();
    assert!(matches!(err, WardenError::WrongPassword));
    assert_eq!(err.to_string(), "Provided keystore password was incorrect");

    loaded.decrypt(&pass("p@ss")).unwrap();
    assert_eq!(loaded.setting_names().unwrap(), vec!["db.password", "tls.p12"]);
    assert_eq!(
        loaded.get_string("db.password").unwrap().expose_secret(),
        "secret123"
    );
    assert_eq!(loaded.get_file("tls.p12").unwrap().as_slice(), b"\x00\x01binary");
}

#[test]
fn changing_password_preserves_values() {
    let dir = tempdir().unwrap();
    let mut keystore = Keystore::create(FAST).unwrap();
    keystore.set_string("api.key", "abc").unwrap();
    keystore.save(dir.path(), &pass("old")).unwrap();

    let mut keystore = Keystore::load_existing(dir.path()).unwrap();
    keystore.decrypt(&pass("old")).unwrap();
    keystore.rekey().unwrap();
    keystore.save(dir.path(), &pass("new")).unwrap();

    let mut reloaded = Keystore::load_existing(dir.path()).unwrap();
    assert!(matches!(
        reloaded.decrypt(&pass("old")),
        Err(WardenError::WrongPassword)
    ));
    reloaded.decrypt(&pass("new")).unwrap();
    assert_eq!(reloaded.get_string("api.key").unwrap().expose_secret(), "abc");
}

#[test]
fn removing_the_password_makes_store_unprotected() {
    let dir = tempdir().unwrap();
    let mut keystore = Keystore::create(FAST).unwrap();
    keystore.save(dir.path(), &pass("p@ss")).unwrap();
    assert!(Keystore::load_existing(dir.path()).unwrap().has_password());

    keystore.save(dir.path(), &Passphrase::empty()).unwrap();
    assert!(!Keystore::load_existing(dir.path()).unwrap().has_password());
}

#[test]
fn non_ascii_value_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let mut keystore = Keystore::create(FAST).unwrap();
    keystore.set_string("greeting", "hello").unwrap();
    keystore.save(dir.path(), &Passphrase::empty()).unwrap();
    let before = fs::read(Keystore::path(dir.path())).unwrap();

    let mut keystore = Keystore::load_existing(dir.path()).unwrap();
    keystore.decrypt(&Passphrase::empty()).unwrap();
    assert!(matches!(
        keystore.set_string("greeting", "grüezi"),
        Err(WardenError::InvalidValue(_))
    ));
    assert_eq!(fs::read(Keystore::path(dir.path())).unwrap(), before);
    assert_eq!(keystore.get_string("greeting").unwrap().expose_secret(), "hello");
}

#[test]
#[traced_test]
fn values_never_reach_the_log() {
    let dir = tempdir().unwrap();
    let mut keystore = Keystore::create(FAST).unwrap();
    keystore.set_string("db.password", "hunter2-secret").unwrap();
    keystore.save(dir.path(), &pass("log-me-not")).unwrap();

    let mut loaded = Keystore::load_existing(dir.path()).unwrap();
    loaded.decrypt(&pass("log-me-not")).unwrap();

    assert!(logs_contain("keystore saved"));
    assert!(logs_contain("db.password"));
    assert!(!logs_contain("hunter2-secret"));
    assert!(!logs_contain("log-me-not"));
}

#[test]
#[serial]
fn startup_reads_passphrase_file_with_crlf() {
    let dir = tempdir().unwrap();
    let mut keystore = Keystore::create(FAST).unwrap();
    keystore.set_string("db.password", "secret123").unwrap();
    keystore.save(dir.path(), &pass("p@ss")).unwrap();

    let config = KeystoreConfig {
        config_dir: dir.path().display().to_string(),
        install_type: InstallType::Package,
        kdf_memory_cost: 8192,
        kdf_iterations: 1,
        kdf_parallelism: 1,
        ..KeystoreConfig::default()
    };

    let mut good = tempfile::NamedTempFile::new().unwrap();
    good.write_all(b"p@ss\r\n").unwrap();
    // SAFETY: serial test.
    unsafe { std::env::set_var(PASSPHRASE_FILE_ENV_VAR, good.path()) };
    let mut terminal = ScriptedTerminal::detached();
    let unlocked = bootstrap(&config, StartupMode::ServiceManaged, &mut terminal);

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(b"p@ss \n").unwrap();
    // SAFETY: serial test.
    unsafe { std::env::set_var(PASSPHRASE_FILE_ENV_VAR, bad.path()) };
    let locked = bootstrap(&config, StartupMode::ServiceManaged, &mut terminal);
    // SAFETY: serial test.
    unsafe { std::env::remove_var(PASSPHRASE_FILE_ENV_VAR) };

    let unlocked = unlocked.unwrap();
    assert_eq!(
        unlocked.get_string("db.password").unwrap().expose_secret(),
        "secret123"
    );
    assert!(matches!(locked, Err(WardenError::WrongPassword)));
}

#[test]
fn truncated_file_is_a_format_error() {
    let dir = tempdir().unwrap();
    Keystore::create(FAST)
        .unwrap()
        .save(dir.path(), &Passphrase::empty())
        .unwrap();
    let path = Keystore::path(dir.path());
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    assert!(matches!(
        Keystore::load(dir.path()),
        Err(WardenError::Format(_))
    ));
}

#[test]
fn unsupported_version_is_a_format_error() {
    let dir = tempdir().unwrap();
    Keystore::create(FAST)
        .unwrap()
        .save(dir.path(), &Passphrase::empty())
        .unwrap();
    let path = Keystore::path(dir.path());
    let mut bytes = fs::read(&path).unwrap();
    bytes[4] = 9;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        Keystore::load(dir.path()),
        Err(WardenError::Format(_))
    ));
}

#[test]
fn oversized_kdf_cost_is_a_format_error() {
    let dir = tempdir().unwrap();
    Keystore::create(FAST)
        .unwrap()
        .save(dir.path(), &pass("p@ss"))
        .unwrap();
    let path = Keystore::path(dir.path());
    let mut bytes = fs::read(&path).unwrap();
    bytes[7..11].copy_from_slice(&0xFFFF_FFF0u32.to_be_bytes());
    fs::write(&path, bytes).unwrap();

    let err = Keystore::load(dir.path()).unwrap_err();
    assert!(matches!(err, WardenError::Format(_)));
    assert_eq!(err.exit_code(), warden_core::exit_code::DATA_ERROR);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn ascii_strings_round_trip(value in "[\\x00-\\x7f]{0,64}") {
        let dir = tempdir().unwrap();
        let mut keystore = Keystore::create(FAST).unwrap();
        keystore.set_string("prop.value", &value).unwrap();
        keystore.save(dir.path(), &Passphrase::empty()).unwrap();

        let mut loaded = Keystore::load_existing(dir.path()).unwrap();
        loaded.decrypt(&Passphrase::empty()).unwrap();
        let read = loaded.get_string("prop.value").unwrap();
        prop_assert_eq!(read.expose_secret(), value.as_str());
    }

    #[test]
    fn non_ascii_strings_are_rejected(
        prefix in "[a-z]{0,8}",
        c in any::<char>().prop_filter("non-ascii", |c| !c.is_ascii()),
    ) {
        let mut keystore = Keystore::create(FAST).unwrap();
        let value = format!("{prefix}{c}");
        let rejected = matches!(
            keystore.set_string("prop.value", &value),
            Err(WardenError::InvalidValue(_))
        );
        prop_assert!(rejected);
        prop_assert!(!keystore.contains("prop.value").unwrap());
    }
}
