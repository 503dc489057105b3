// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase acquisition.
//!
//! A passphrase can arrive through three channels, tried in this order:
//!
//! 1. a file named by `WARDEN_KEYSTORE_PASSPHRASE_FILE` (for service managers),
//! 2. piped standard input,
//! 3. a masked prompt on the controlling terminal.
//!
//! [`PassphraseResolver`] holds the channels that apply to the current
//! operation and returns the first passphrase one of them produces.

use std::path::PathBuf;

use tracing::debug;
use warden_config::PASSPHRASE_FILE_ENV_VAR;
use warden_core::{
    Passphrase, PassphrasePurpose, PassphraseSource, StartupMode, Terminal, WardenError,
};
use zeroize::Zeroizing;

const UNLOCK_PROMPT: &str = "Enter password for the keystore : ";
const NEW_PROMPT: &str = "Enter new password for the keystore (empty for no password): ";
const CONFIRM_PROMPT: &str = "Enter same password again: ";

/// Reads the passphrase from the file named by an environment variable.
///
/// Unavailable when the variable is unset or empty. A set variable pointing at
/// an unreadable file is an error, not a fall-through.
#[derive(Debug, Clone)]
pub struct EnvFileSource {
    var: &'static str,
}

impl EnvFileSource {
    pub fn new() -> Self {
        Self {
            var: PASSPHRASE_FILE_ENV_VAR,
        }
    }

    fn path(&self) -> Option<PathBuf> {
        std::env::var_os(self.var)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for EnvFileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseSource for EnvFileSource {
    fn name(&self) -> &'static str {
        "environment file"
    }

    fn acquire(
        &self,
        _terminal: &mut dyn Terminal,
        _purpose: PassphrasePurpose,
    ) -> Result<Option<Passphrase>, WardenError> {
        let Some(path) = self.path() else {
            return Ok(None);
        };
        let mut bytes = Zeroizing::new(
            std::fs::read(&path)
                .map_err(|e| WardenError::io(&path, "failed to read keystore passphrase file", e))?,
        );
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        Ok(Some(Passphrase::new(bytes.to_vec())))
    }
}

/// Reads the passphrase from non-interactive standard input.
///
/// One line to unlock; two lines (value and confirmation) for a new passphrase.
#[derive(Debug, Clone, Default)]
pub struct PipedStdinSource;

impl PassphraseSource for PipedStdinSource {
    fn name(&self) -> &'static str {
        "standard input"
    }

    fn acquire(
        &self,
        terminal: &mut dyn Terminal,
        purpose: PassphrasePurpose,
    ) -> Result<Option<Passphrase>, WardenError> {
        if terminal.is_interactive() {
            return Ok(None);
        }
        let Some(first) = terminal.read_line()? else {
            return Ok(None);
        };
        if purpose == PassphrasePurpose::New {
            let confirm = terminal.read_line()?.ok_or(WardenError::PassphraseMismatch)?;
            ensure_equal(&first, &confirm)?;
        }
        Ok(Some(Passphrase::new(first.as_bytes().to_vec())))
    }
}

/// Prompts on the controlling terminal with echo disabled.
#[derive(Debug, Clone, Default)]
pub struct TerminalPromptSource;

impl PassphraseSource for TerminalPromptSource {
    fn name(&self) -> &'static str {
        "terminal prompt"
    }

    fn acquire(
        &self,
        terminal: &mut dyn Terminal,
        purpose: PassphrasePurpose,
    ) -> Result<Option<Passphrase>, WardenError> {
        if !terminal.is_interactive() {
            return Ok(None);
        }
        let passphrase = match purpose {
            PassphrasePurpose::Unlock => terminal.read_secret(UNLOCK_PROMPT)?,
            PassphrasePurpose::New => {
                let first = terminal.read_secret(NEW_PROMPT)?;
                let confirm = terminal.read_secret(CONFIRM_PROMPT)?;
                ensure_equal(&first, &confirm)?;
                first
            }
        };
        Ok(Some(Passphrase::new(passphrase.as_bytes().to_vec())))
    }
}

fn ensure_equal(first: &str, second: &str) -> Result<(), WardenError> {
    if Passphrase::new(first.as_bytes().to_vec()) == Passphrase::new(second.as_bytes().to_vec()) {
        Ok(())
    } else {
        Err(WardenError::PassphraseMismatch)
    }
}

/// Ordered list of passphrase sources.
pub struct PassphraseResolver {
    sources: Vec<Box<dyn PassphraseSource>>,
}

impl std::fmt::Debug for PassphraseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("PassphraseResolver")
            .field("sources", &names)
            .finish()
    }
}

impl PassphraseResolver {
    pub fn new(sources: Vec<Box<dyn PassphraseSource>>) -> Self {
        Self { sources }
    }

    /// Sources for unlocking an existing keystore from the command line.
    pub fn for_unlock() -> Self {
        Self::for_mode(StartupMode::Interactive)
    }

    /// Sources for choosing a new passphrase.
    ///
    /// The environment file is deliberately absent: new passphrases are
    /// always typed or piped by the operator.
    pub fn for_new_passphrase() -> Self {
        Self::new(vec![
            Box::new(PipedStdinSource),
            Box::new(TerminalPromptSource),
        ])
    }

    /// Sources for unlocking at startup.
    ///
    /// A service manager gives the process neither stdin nor a terminal, so
    /// only the environment file applies.
    pub fn for_mode(mode: StartupMode) -> Self {
        match mode {
            StartupMode::Interactive => Self::new(vec![
                Box::new(EnvFileSource::new()),
                Box::new(PipedStdinSource),
                Box::new(TerminalPromptSource),
            ]),
            StartupMode::ServiceManaged => Self::new(vec![Box::new(EnvFileSource::new())]),
        }
    }

    /// Return the passphrase from the first source that has one.
    pub fn resolve(
        &self,
        terminal: &mut dyn Terminal,
        purpose: PassphrasePurpose,
    ) -> Result<Option<Passphrase>, WardenError> {
        for source in &self.sources {
            if let Some(passphrase) = source.acquire(terminal, purpose)? {
                debug!(source = source.name(), ?purpose, "keystore passphrase acquired");
                return Ok(Some(passphrase));
            }
        }
        debug!(?purpose, "no keystore passphrase source available");
        Ok(None)
    }

    /// Like [`resolve`](Self::resolve), treating "no source" as the empty passphrase.
    pub fn resolve_or_empty(
        &self,
        terminal: &mut dyn Terminal,
        purpose: PassphrasePurpose,
    ) -> Result<Passphrase, WardenError> {
        Ok(self
            .resolve(terminal, purpose)?
            .unwrap_or_else(Passphrase::empty))
    }
}
