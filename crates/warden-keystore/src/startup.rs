// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keystore handling at server startup.

use std::path::Path;

use tracing::{error, info};
use warden_config::KeystoreConfig;
use warden_core::{InstallType, Passphrase, PassphrasePurpose, StartupMode, Terminal, WardenError};

use crate::kdf::KdfParams;
use crate::keystore::{FileOwner, Keystore};
use crate::passphrase::PassphraseResolver;

impl From<&KeystoreConfig> for FileOwner {
    fn from(config: &KeystoreConfig) -> Self {
        Self {
            uid: config.owner_uid,
            gid: config.owner_gid,
        }
    }
}

/// Open the keystore for a starting server, returning it unlocked.
///
/// - No keystore on an archive install: create an unprotected one with a
///   fresh seed and save it.
/// - No keystore on a package install: [`WardenError::NotFound`].
/// - Unprotected keystore: decrypt with the empty passphrase; no source is
///   consulted.
/// - Protected keystore: resolve the passphrase for `mode` and decrypt. A
///   wrong passphrase aborts startup with [`WardenError::WrongPassword`].
pub fn bootstrap(
    config: &KeystoreConfig,
    mode: StartupMode,
    terminal: &mut dyn Terminal,
) -> Result<Keystore, WardenError> {
    let config_dir = Path::new(&config.config_dir);
    let owner = FileOwner::from(config);

    let Some(mut keystore) = Keystore::load(config_dir)? else {
        return create_on_first_start(config, config_dir, owner);
    };
    keystore.set_owner(owner);

    if !keystore.has_password() {
        keystore.decrypt(&Passphrase::empty())?;
        info!("unprotected keystore loaded");
        return Ok(keystore);
    }

    let passphrase = PassphraseResolver::for_mode(mode)
        .resolve_or_empty(terminal, PassphrasePurpose::Unlock)?;
    if let Err(e) = keystore.decrypt(&passphrase) {
        error!(error = %e, %mode, "failed to unlock keystore");
        return Err(e);
    }
    info!(%mode, "keystore unlocked");
    Ok(keystore)
}

fn create_on_first_start(
    config: &KeystoreConfig,
    config_dir: &Path,
    owner: FileOwner,
) -> Result<Keystore, WardenError> {
    let path = Keystore::path(config_dir);
    if config.install_type == InstallType::Package {
        error!(path = %path.display(), "keystore missing from package install");
        return Err(WardenError::NotFound { path });
    }

    let mut keystore = Keystore::create_with_seed(KdfParams::from(config))?;
    keystore.set_owner(owner);
    keystore.save(config_dir, &Passphrase::empty())?;
    info!(path = %path.display(), "created unprotected keystore on first start");
    Ok(keystore)
}
