// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the keystore, its CLI, and the startup path.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use zeroize::Zeroizing;

/// How the installation was laid out on disk.
///
/// Decides whether a missing keystore may be created implicitly at startup
/// and who should own the file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstallType {
    /// Self-managed archive layout; the running user owns the config directory.
    #[default]
    Archive,
    /// Package-manager owned layout; the keystore is installed with the package.
    Package,
}

/// How the server process was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum StartupMode {
    /// Started from a shell: piped stdin and a terminal may be available.
    Interactive,
    /// Started by a service manager: no controlling terminal, no stdin.
    ServiceManaged,
}

/// Why a passphrase is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphrasePurpose {
    /// Unlock an existing keystore (read once).
    Unlock,
    /// Seal a keystore under a new passphrase (read twice and compared).
    New,
}

/// Passphrase bytes, wiped from memory when dropped.
///
/// An empty passphrase means the keystore is unprotected.
pub struct Passphrase(Zeroizing<Vec<u8>>);

impl Passphrase {
    /// Take ownership of raw passphrase bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// The empty passphrase used for unprotected keystores.
    pub fn empty() -> Self {
        Self(Zeroizing::new(Vec::new()))
    }

    /// Take ownership of a string read from a prompt or pipe.
    pub fn from_string(value: String) -> Self {
        Self::new(value.into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Passphrase").field(&"[REDACTED]").finish()
    }
}

impl PartialEq for Passphrase {
    fn eq(&self, other: &Self) -> bool {
        ring::constant_time::verify_slices_are_equal(self.as_bytes(), other.as_bytes()).is_ok()
    }
}

impl Eq for Passphrase {}
