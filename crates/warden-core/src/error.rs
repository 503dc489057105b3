// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Warden keystore.

use std::path::PathBuf;

use thiserror::Error;

/// Process exit statuses, following the BSD `sysexits.h` convention.
pub mod exit_code {
    /// Successful termination.
    pub const OK: i32 = 0;
    /// `has-passwd` on a keystore without a passphrase.
    pub const NOT_PROTECTED: i32 = 1;
    /// The command was used incorrectly.
    pub const USAGE: i32 = 64;
    /// The input data was incorrect in some way.
    pub const DATA_ERROR: i32 = 65;
    /// An input file did not exist or was not readable.
    pub const NO_INPUT: i32 = 66;
    /// Internal software error.
    pub const SOFTWARE: i32 = 70;
    /// An error occurred while doing I/O on some file.
    pub const IO_ERROR: i32 = 74;
    /// Insufficient permission to perform the operation.
    pub const NO_PERMISSION: i32 = 77;
    /// Something was found in an unconfigured or misconfigured state.
    pub const CONFIG: i32 = 78;
}

/// The error type shared by the keystore library, its CLI, and the startup path.
#[derive(Debug, Error)]
pub enum WardenError {
    /// No keystore file exists where one was expected.
    #[error("keystore not found at [{}]", path.display())]
    NotFound { path: PathBuf },

    /// The keystore header or payload is unreadable, corrupt, or of an unsupported version.
    #[error("keystore format error: {0}")]
    Format(String),

    /// Authenticated decryption failed.
    ///
    /// Deliberately carries no detail: a wrong passphrase and a tampered file
    /// are indistinguishable to the caller.
    #[error("Provided keystore password was incorrect")]
    WrongPassword,

    /// A setting value was rejected before reaching the cipher layer.
    #[error("{0}")]
    InvalidValue(String),

    /// The filesystem denied access to the keystore or one of its inputs.
    #[error("permission denied accessing [{}]: {source}", path.display())]
    Permission {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed invocation: bad setting name, missing setting, wrong value kind.
    #[error("{0}")]
    Usage(String),

    /// The two entries of a new passphrase differ.
    #[error("Passphrases are not equal, exiting.")]
    PassphraseMismatch,

    /// The keystore exists but has no passphrase.
    #[error("Keystore is not password-protected")]
    NotProtected,

    /// Settings were read before the keystore was decrypted.
    #[error("keystore is locked -- decrypt it before reading settings")]
    Locked,

    /// Any other I/O failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    /// Random number generation or key derivation parameter failures.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),
}

impl WardenError {
    /// Wrap an I/O error, promoting `PermissionDenied` to [`WardenError::Permission`].
    pub fn io(path: impl Into<PathBuf>, context: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            WardenError::Permission {
                path: path.into(),
                source,
            }
        } else {
            WardenError::Io {
                context: context.into(),
                source,
            }
        }
    }

    /// The process exit status an invocation failing with this error should report.
    pub fn exit_code(&self) -> i32 {
        match self {
            WardenError::NotFound { .. } => exit_code::NO_INPUT,
            WardenError::Format(_)
            | WardenError::WrongPassword
            | WardenError::InvalidValue(_)
            | WardenError::PassphraseMismatch => exit_code::DATA_ERROR,
            WardenError::Permission { .. } => exit_code::NO_PERMISSION,
            WardenError::Usage(_) => exit_code::USAGE,
            WardenError::NotProtected => exit_code::NOT_PROTECTED,
            WardenError::Locked | WardenError::Crypto(_) => exit_code::SOFTWARE,
            WardenError::Io { .. } => exit_code::IO_ERROR,
            WardenError::Config(_) => exit_code::CONFIG,
        }
    }
}
