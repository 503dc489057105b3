// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase-based key derivation.
//!
//! Current keystores derive a 32-byte key with Argon2id (Version::V0x13) using
//! the cost parameters recorded in the file header. Format version 1 files used
//! PBKDF2-HMAC-SHA256 and are still readable.

use std::num::NonZeroU32;

use ring::rand::{SecureRandom, SystemRandom};
use warden_config::validation::{MAX_KDF_ITERATIONS, MAX_KDF_MEMORY_COST, MAX_KDF_PARALLELISM};
use warden_config::KeystoreConfig;
use warden_core::WardenError;
use zeroize::Zeroizing;

/// Length of the per-keystore salt.
pub const SALT_LEN: usize = 16;

/// Length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// Largest PBKDF2 iteration count accepted from a legacy header.
pub const MAX_PBKDF2_ITERATIONS: u32 = 1_000_000;

/// Key derivation function and its cost parameters, as stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParams {
    /// Argon2id with memory cost in KiB, iteration count, and lane count.
    Argon2id {
        memory_cost: u32,
        iterations: u32,
        parallelism: u32,
    },
    /// PBKDF2-HMAC-SHA256, only produced by format version 1.
    Pbkdf2Sha256 { iterations: u32 },
}

impl KdfParams {
    pub fn is_legacy(&self) -> bool {
        matches!(self, KdfParams::Pbkdf2Sha256 { .. })
    }

    /// Reject cost parameters that would exhaust memory or stall derivation.
    ///
    /// Applied to parameters read from a file header before any key is derived.
    pub fn check_bounds(&self) -> Result<(), WardenError> {
        match *self {
            KdfParams::Argon2id {
                memory_cost,
                iterations,
                parallelism,
            } => {
                if !(1..=MAX_KDF_PARALLELISM).contains(&parallelism) {
                    return Err(WardenError::Format(format!(
                        "Argon2id parallelism {parallelism} out of range 1..={MAX_KDF_PARALLELISM}"
                    )));
                }
                // Argon2 needs at least 8 KiB per lane.
                let min_memory = 8 * parallelism;
                if !(min_memory..=MAX_KDF_MEMORY_COST).contains(&memory_cost) {
                    return Err(WardenError::Format(format!(
                        "Argon2id memory cost {memory_cost} KiB out of range {min_memory}..={MAX_KDF_MEMORY_COST}"
                    )));
                }
                if !(1..=MAX_KDF_ITERATIONS).contains(&iterations) {
                    return Err(WardenError::Format(format!(
                        "Argon2id iteration count {iterations} out of range 1..={MAX_KDF_ITERATIONS}"
                    )));
                }
            }
            KdfParams::Pbkdf2Sha256 { iterations } => {
                if !(1..=MAX_PBKDF2_ITERATIONS).contains(&iterations) {
                    return Err(WardenError::Format(format!(
                        "PBKDF2 iteration count {iterations} out of range 1..={MAX_PBKDF2_ITERATIONS}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl From<&KeystoreConfig> for KdfParams {
    fn from(config: &KeystoreConfig) -> Self {
        KdfParams::Argon2id {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        }
    }
}

/// Derive a 32-byte key from a passphrase and salt.
///
/// Deterministic for a given passphrase, salt, and parameter set. The returned
/// key is wrapped in [`Zeroizing`] for automatic memory zeroing on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, WardenError> {
    let mut output = Zeroizing::new([0u8; KEY_LEN]);

    match *params {
        KdfParams::Argon2id {
            memory_cost,
            iterations,
            parallelism,
        } => {
            let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(KEY_LEN))
                .map_err(|e| WardenError::Crypto(format!("invalid Argon2id parameters: {e}")))?;
            let argon2 =
                argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
            argon2
                .hash_password_into(passphrase, salt, output.as_mut())
                .map_err(|e| WardenError::Crypto(format!("Argon2id key derivation failed: {e}")))?;
        }
        KdfParams::Pbkdf2Sha256 { iterations } => {
            let iterations = NonZeroU32::new(iterations)
                .ok_or_else(|| WardenError::Format("PBKDF2 iteration count is zero".to_string()))?;
            ring::pbkdf2::derive(
                ring::pbkdf2::PBKDF2_HMAC_SHA256,
                iterations,
                salt,
                passphrase,
                output.as_mut(),
            );
        }
    }

    Ok(output)
}

/// Generate a random salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], WardenError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| WardenError::Crypto("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost for fast tests.
    const FAST: KdfParams = KdfParams::Argon2id {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn derive_key_produces_consistent_output() {
        let salt = [1u8; SALT_LEN];
        let key1 = derive_key(b"test passphrase", &salt, &FAST).unwrap();
        let key2 = derive_key(b"test passphrase", &salt, &FAST).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn derive_key_different_passphrase_produces_different_output() {
        let salt = [2u8; SALT_LEN];
        let key1 = derive_key(b"passphrase one", &salt, &FAST).unwrap();
        let key2 = derive_key(b"passphrase two", &salt, &FAST).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn derive_key_different_salt_produces_different_output() {
        let key1 = derive_key(b"same", &[1u8; SALT_LEN], &FAST).unwrap();
        let key2 = derive_key(b"same", &[2u8; SALT_LEN], &FAST).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn empty_passphrase_is_accepted() {
        let key = derive_key(b"", &[3u8; SALT_LEN], &FAST).unwrap();
        assert_eq!(key.len(), KEY_LEN);
    }

    #[test]
    fn legacy_pbkdf2_is_deterministic_and_distinct_from_argon2() {
        let salt = [4u8; SALT_LEN];
        let legacy = KdfParams::Pbkdf2Sha256 { iterations: 1000 };
        let a = derive_key(b"pw", &salt, &legacy).unwrap();
        let b = derive_key(b"pw", &salt, &legacy).unwrap();
        let c = derive_key(b"pw", &salt, &FAST).unwrap();
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }

    #[test]
    fn invalid_argon2_parameters_are_rejected() {
        let bad = KdfParams::Argon2id {
            memory_cost: 1,
            iterations: 1,
            parallelism: 1,
        };
        assert!(matches!(
            derive_key(b"pw", &[0u8; SALT_LEN], &bad),
            Err(WardenError::Crypto(_))
        ));
    }

    #[test]
    fn bounds_accept_defaults_and_reject_extremes() {
        FAST.check_bounds().unwrap();
        KdfParams::from(&KeystoreConfig::default()).check_bounds().unwrap();
        KdfParams::Pbkdf2Sha256 { iterations: 210_000 }
            .check_bounds()
            .unwrap();

        for bad in [
            KdfParams::Argon2id {
                memory_cost: 0xFFFF_FFF0,
                iterations: 1,
                parallelism: 1,
            },
            KdfParams::Argon2id {
                memory_cost: 8192,
                iterations: 0,
                parallelism: 1,
            },
            KdfParams::Argon2id {
                memory_cost: 8192,
                iterations: u32::MAX,
                parallelism: 1,
            },
            KdfParams::Argon2id {
                memory_cost: 8192,
                iterations: 1,
                parallelism: 0,
            },
            KdfParams::Argon2id {
                memory_cost: 8,
                iterations: 1,
                parallelism: 4,
            },
            KdfParams::Pbkdf2Sha256 { iterations: 0 },
            KdfParams::Pbkdf2Sha256 {
                iterations: u32::MAX,
            },
        ] {
            assert!(
                matches!(bad.check_bounds(), Err(WardenError::Format(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn generate_salt_produces_random_values() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }

    #[test]
    fn params_follow_config() {
        let config = KeystoreConfig {
            kdf_memory_cost: 16384,
            kdf_iterations: 2,
            kdf_parallelism: 1,
            ..KeystoreConfig::default()
        };
        assert_eq!(
            KdfParams::from(&config),
            KdfParams::Argon2id {
                memory_cost: 16384,
                iterations: 2,
                parallelism: 1
            }
        );
        assert!(!KdfParams::from(&config).is_legacy());
    }
}
