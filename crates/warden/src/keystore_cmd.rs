// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `warden keystore` subcommands.
//!
//! Each command loads the keystore from the configured directory, unlocks it
//! only when it needs the settings, and re-saves the whole store after every
//! mutation. All operator interaction goes through [`Terminal`].

use std::path::{Path, PathBuf};

use clap::Subcommand;
use tracing::{info, warn};
use warden_config::KeystoreConfig;
use warden_core::{Passphrase, PassphrasePurpose, Terminal, WardenError};
use warden_keystore::format::CURRENT_VERSION;
use warden_keystore::{
    validate_name, FileOwner, KdfParams, Keystore, PassphraseResolver, TerminalPromptSource,
};
use zeroize::Zeroizing;

/// Keystore management commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KeystoreCommand {
    /// Create a new keystore, replacing any existing one.
    Create {
        /// Protect the keystore with a passphrase.
        #[arg(short = 'p', long)]
        password: bool,
    },
    /// Exit successfully if the keystore is password-protected.
    HasPasswd,
    /// List setting names, one per line.
    List,
    /// Add a string setting.
    Add {
        /// Setting name.
        name: String,
        /// Read the value from standard input instead of prompting.
        #[arg(short = 'x', long)]
        stdin: bool,
        /// Overwrite without asking and create the keystore if missing.
        #[arg(short, long)]
        force: bool,
    },
    /// Add a file setting.
    AddFile {
        /// Setting name.
        name: String,
        /// File whose contents become the value.
        path: PathBuf,
        /// Overwrite without asking and create the keystore if missing.
        #[arg(short, long)]
        force: bool,
    },
    /// Remove a setting.
    Remove {
        /// Setting name.
        name: String,
    },
    /// Change the keystore passphrase.
    Passwd,
    /// Rewrite a legacy keystore in the current format.
    Upgrade,
}

/// Run one keystore command against the configured directory.
pub fn run(
    command: KeystoreCommand,
    config: &KeystoreConfig,
    terminal: &mut dyn Terminal,
) -> Result<(), WardenError> {
    match command {
        KeystoreCommand::Create { password } => create(config, password, terminal),
        KeystoreCommand::HasPasswd => has_passwd(config, terminal),
        KeystoreCommand::List => list(config, terminal),
        KeystoreCommand::Add { name, stdin, force } => {
            add_string(config, &name, stdin, force, terminal)
        }
        KeystoreCommand::AddFile { name, path, force } => {
            add_file(config, &name, &path, force, terminal)
        }
        KeystoreCommand::Remove { name } => remove(config, &name, terminal),
        KeystoreCommand::Passwd => passwd(config, terminal),
        KeystoreCommand::Upgrade => upgrade(config, terminal),
    }
}

fn config_dir(config: &KeystoreConfig) -> &Path {
    Path::new(&config.config_dir)
}

fn create(
    config: &KeystoreConfig,
    password: bool,
    terminal: &mut dyn Terminal,
) -> Result<(), WardenError> {
    let dir = config_dir(config);
    if Keystore::exists(dir)
        && !confirm(
            terminal,
            "A warden keystore already exists. Overwrite?",
            "remove the existing keystore first",
        )?
    {
        terminal.println("Exiting without creating keystore.");
        return Ok(());
    }

    let passphrase = if password {
        PassphraseResolver::for_new_passphrase()
            .resolve(terminal, PassphrasePurpose::New)?
            .ok_or_else(|| {
                WardenError::Usage(
                    "a new passphrase must be typed at a terminal or piped on standard input"
                        .to_string(),
                )
            })?
    } else {
        Passphrase::empty()
    };

    let mut keystore = Keystore::create_with_seed(KdfParams::from(config))?;
    keystore.set_owner(FileOwner::from(config));
    keystore.save(dir, &passphrase)?;
    info!(protected = !passphrase.is_empty(), "keystore created");
    report_created(dir, terminal);
    Ok(())
}

fn report_created(dir: &Path, terminal: &mut dyn Terminal) {
    terminal.println(&format!(
        "Created warden keystore in {}",
        Keystore::path(dir).display()
    ));
}

fn has_passwd(config: &KeystoreConfig, terminal: &mut dyn Terminal) -> Result<(), WardenError> {
    let keystore = Keystore::load_existing(config_dir(config))?;
    if !keystore.has_password() {
        return Err(WardenError::NotProtected);
    }
    terminal.println("Keystore is password-protected");
    Ok(())
}

fn list(config: &KeystoreConfig, terminal: &mut dyn Terminal) -> Result<(), WardenError> {
    let (keystore, _passphrase) = open(config, terminal)?;
    for name in keystore.setting_names()? {
        terminal.println(&name);
    }
    Ok(())
}

fn add_string(
    config: &KeystoreConfig,
    name: &str,
    from_stdin: bool,
    force: bool,
    terminal: &mut dyn Terminal,
) -> Result<(), WardenError> {
    validate_name(name)?;
    let Some(mut target) = open_or_create(config, force, terminal)? else {
        return Ok(());
    };
    if !confirm_overwrite(&target.keystore, name, force, terminal)? {
        return Ok(());
    }

    let value: Zeroizing<String> = if from_stdin {
        terminal
            .read_line()?
            .ok_or_else(|| WardenError::Usage("no value on standard input".to_string()))?
    } else {
        terminal.read_secret(&format!("Enter value for {name}: "))?
    };
    target.keystore.set_string(name, &value)?;
    target.save(config_dir(config), terminal)
}

fn add_file(
    config: &KeystoreConfig,
    name: &str,
    path: &Path,
    force: bool,
    terminal: &mut dyn Terminal,
) -> Result<(), WardenError> {
    validate_name(name)?;
    if !path.is_file() {
        return Err(WardenError::Usage(format!(
            "File [{}] does not exist",
            path.display()
        )));
    }
    let Some(mut target) = open_or_create(config, force, terminal)? else {
        return Ok(());
    };
    if !confirm_overwrite(&target.keystore, name, force, terminal)? {
        return Ok(());
    }

    let bytes = Zeroizing::new(
        std::fs::read(path).map_err(|e| WardenError::io(path, "failed to read setting file", e))?,
    );
    target.keystore.set_file(name, &bytes)?;
    target.save(config_dir(config), terminal)
}

fn remove(config: &KeystoreConfig, name: &str, terminal: &mut dyn Terminal) -> Result<(), WardenError> {
    let (mut keystore, passphrase) = open(config, terminal)?;
    keystore.remove(name)?;
    keystore.save(config_dir(config), &passphrase)
}

fn passwd(config: &KeystoreConfig, terminal: &mut dyn Terminal) -> Result<(), WardenError> {
    let (mut keystore, _current) = open(config, terminal)?;
    let new = PassphraseResolver::for_new_passphrase()
        .resolve(terminal, PassphrasePurpose::New)?
        .ok_or_else(|| {
            WardenError::Usage(
                "a new passphrase must be typed at a terminal or piped on standard input"
                    .to_string(),
            )
        })?;

    keystore.rekey()?;
    keystore.save(config_dir(config), &new)?;
    info!(protected = !new.is_empty(), "keystore passphrase changed");
    terminal.println("Keystore password changed successfully.");
    Ok(())
}

fn upgrade(config: &KeystoreConfig, terminal: &mut dyn Terminal) -> Result<(), WardenError> {
    let (mut keystore, passphrase) = open(config, terminal)?;
    if keystore.upgrade(config_dir(config), &passphrase, KdfParams::from(config))? {
        terminal.println(&format!(
            "Keystore upgraded to format version {CURRENT_VERSION}."
        ));
    } else {
        terminal.println(&format!(
            "Keystore is already at the latest version ({CURRENT_VERSION})."
        ));
    }
    Ok(())
}

/// Load and unlock an existing keystore, asking for a passphrase only if it is protected.
fn open(
    config: &KeystoreConfig,
    terminal: &mut dyn Terminal,
) -> Result<(Keystore, Passphrase), WardenError> {
    let mut keystore = Keystore::load_existing(config_dir(config))?;
    keystore.set_owner(FileOwner::from(config));
    let passphrase = if keystore.has_password() {
        PassphraseResolver::for_unlock().resolve_or_empty(terminal, PassphrasePurpose::Unlock)?
    } else {
        Passphrase::empty()
    };
    keystore.decrypt(&passphrase)?;
    Ok((keystore, passphrase))
}

/// A keystore opened for adding a setting, possibly created just now.
struct AddTarget {
    keystore: Keystore,
    passphrase: Passphrase,
    created: bool,
}

impl AddTarget {
    fn save(&mut self, dir: &Path, terminal: &mut dyn Terminal) -> Result<(), WardenError> {
        self.keystore.save(dir, &self.passphrase)?;
        if self.created {
            report_created(dir, terminal);
        }
        Ok(())
    }
}

/// Like [`open`], but offers to create the keystore when it is missing.
///
/// Returns `None` if the operator declines.
fn open_or_create(
    config: &KeystoreConfig,
    force: bool,
    terminal: &mut dyn Terminal,
) -> Result<Option<AddTarget>, WardenError> {
    if Keystore::exists(config_dir(config)) {
        let (keystore, passphrase) = open(config, terminal)?;
        return Ok(Some(AddTarget {
            keystore,
            passphrase,
            created: false,
        }));
    }
    if !force
        && !confirm(
            terminal,
            "The warden keystore does not exist. Do you want to create it?",
            "pass --force to create it",
        )?
    {
        terminal.println("Exiting without creating keystore.");
        return Ok(None);
    }

    // Stdin carries the setting value here, so only a terminal may supply a
    // passphrase for the new store.
    let passphrase = PassphraseResolver::new(vec![Box::new(TerminalPromptSource)])
        .resolve_or_empty(terminal, PassphrasePurpose::New)?;
    let mut keystore = Keystore::create_with_seed(KdfParams::from(config))?;
    keystore.set_owner(FileOwner::from(config));
    info!(protected = !passphrase.is_empty(), "creating keystore for new setting");
    Ok(Some(AddTarget {
        keystore,
        passphrase,
        created: true,
    }))
}

/// Ask `question` on the terminal, defaulting to no.
///
/// Without a terminal nothing is read: stdin may hold a secret. The operator
/// is told how to proceed instead.
fn confirm(
    terminal: &mut dyn Terminal,
    question: &str,
    hint: &str,
) -> Result<bool, WardenError> {
    if !terminal.is_interactive() {
        terminal.eprintln(&format!(
            "{question} Not running on a terminal, so not confirmed; {hint}."
        ));
        return Ok(false);
    }
    terminal.prompt_yes_no(question, false)
}

fn confirm_overwrite(
    keystore: &Keystore,
    name: &str,
    force: bool,
    terminal: &mut dyn Terminal,
) -> Result<bool, WardenError> {
    if !keystore.contains(name)? {
        return Ok(true);
    }
    if !force
        && !confirm(
            terminal,
            &format!("Setting {name} already exists. Overwrite?"),
            "pass --force to overwrite it",
        )?
    {
        terminal.println("Exiting without modifying keystore.");
        return Ok(false);
    }
    warn!(name = %name, "overwriting existing keystore setting");
    Ok(true)
}
