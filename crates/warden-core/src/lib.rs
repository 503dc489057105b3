// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Warden keystore.
//!
//! This crate provides the error taxonomy, exit codes, shared types, and the
//! trait seams (terminal, passphrase source) used throughout the workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{exit_code, WardenError};
pub use types::{InstallType, Passphrase, PassphrasePurpose, StartupMode};

pub use traits::{PassphraseSource, Terminal};
