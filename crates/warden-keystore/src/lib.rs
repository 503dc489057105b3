// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase-protected local keystore for Warden.
//!
//! Settings (ASCII strings and opaque file blobs) live in a single file,
//! `warden.keystore`, encrypted with AES-256-GCM under a key derived from an
//! optional passphrase via Argon2id. Saves go through a temporary file and a
//! rename so readers never see a partial keystore.

pub mod crypto;
pub mod format;
pub mod kdf;
pub mod keystore;
pub mod passphrase;
pub mod startup;
pub mod terminal;

pub use format::SettingKind;
pub use kdf::KdfParams;
pub use keystore::{validate_name, FileOwner, Keystore, StagedSave, KEYSTORE_FILENAME, SEED_SETTING};
pub use passphrase::{EnvFileSource, PassphraseResolver, PipedStdinSource, TerminalPromptSource};
pub use startup::bootstrap;
pub use terminal::ConsoleTerminal;

#[cfg(any(test, feature = "test-utils"))]
pub use terminal::ScriptedTerminal;
