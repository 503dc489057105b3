// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `warden start` command implementation.
//!
//! Opens the keystore the way a starting server does and hands the unlocked
//! settings to the configuration layer. Under a service manager there is no
//! terminal and no stdin: a protected keystore can only be unlocked through
//! `WARDEN_KEYSTORE_PASSPHRASE_FILE`, which the unit file must export.

use tracing::{info, warn};
use warden_config::{KeystoreConfig, PASSPHRASE_FILE_ENV_VAR};
use warden_core::{StartupMode, Terminal, WardenError};
use warden_keystore::bootstrap;

/// Run startup keystore handling and return the names of the available settings.
pub fn run_start(
    config: &KeystoreConfig,
    mode: StartupMode,
    terminal: &mut dyn Terminal,
) -> Result<Vec<String>, WardenError> {
    info!(%mode, install_type = %config.install_type, "starting warden");
    if mode == StartupMode::ServiceManaged && std::env::var_os(PASSPHRASE_FILE_ENV_VAR).is_none() {
        warn!("{PASSPHRASE_FILE_ENV_VAR} is not set -- only an unprotected keystore can be opened");
    }

    let keystore = bootstrap(config, mode, terminal)?;
    let names = keystore.setting_names()?;
    info!(settings = names.len(), "keystore settings available to configuration");

    terminal.println(&format!("Keystore loaded with {} settings:", names.len()));
    for name in &names {
        terminal.println(&format!("  {name}"));
    }
    Ok(names)
}
