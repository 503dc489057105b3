// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use warden_core::WardenError;
use zeroize::Zeroizing;

/// Length of the AES-256-GCM nonce.
pub const NONCE_LEN: usize = 12;

/// Length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

fn key_for(key: &[u8; 32]) -> Result<LessSafeKey, WardenError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| WardenError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt plaintext with AES-256-GCM using a random 96-bit nonce.
///
/// `aad` is authenticated but not encrypted. Returns
/// `(ciphertext_with_tag, nonce_bytes)`; the caller stores both.
pub fn seal(
    key: &[u8; 32],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), WardenError> {
    let less_safe = key_for(key)?;

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| WardenError::Crypto("failed to generate random nonce".to_string()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    // Seal in place: the buffer is extended with the authentication tag.
    // It holds plaintext until sealing succeeds.
    let mut in_out = Zeroizing::new(plaintext.to_vec());
    less_safe
        .seal_in_place_append_tag(nonce, Aad::from(aad), &mut *in_out)
        .map_err(|_| WardenError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok((std::mem::take(&mut *in_out), nonce_bytes))
}

/// Decrypt and verify ciphertext with AES-256-GCM.
///
/// Any failure (wrong key, wrong AAD, tampered bytes) is reported as
/// [`WardenError::WrongPassword`]; no partially decrypted data escapes.
pub fn open(
    key: &[u8; 32],
    nonce_bytes: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, WardenError> {
    let less_safe = key_for(key)?;
    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let plaintext_len = less_safe
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| WardenError::WrongPassword)?
        .len();
    in_out.truncate(plaintext_len);

    Ok(in_out)
}

/// Fill a buffer with bytes from the system CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], WardenError> {
    let rng = SystemRandom::new();
    let mut out = [0u8; N];
    rng.fill(&mut out)
        .map_err(|_| WardenError::Crypto("failed to generate random bytes".to_string()))?;
    Ok(out)
}
