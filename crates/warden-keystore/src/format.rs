// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk layout of `warden.keystore`.
//!
//! ```text
//! magic        4 bytes  "WKS\x01"
//! version      u8
//! flags        u8       bit 0 = has password
//! kdf id       u8       1 = argon2id, 2 = pbkdf2-hmac-sha256
//! kdf params   3 x u32  argon2id: memory KiB, iterations, lanes
//!                       pbkdf2:   iterations, 0, 0
//! salt         u8 length + bytes
//! nonce        12 bytes
//! ciphertext   u32 length + bytes (GCM tag included)
//! ```
//!
//! Integers are big-endian. Everything before the nonce is the authenticated
//! prefix: version 2 binds it to the ciphertext as AAD, version 1 did not.
//!
//! The decrypted payload is `u32 count` followed by `count` entries of
//! `u8 kind, u16 name length, name, u32 value length, value`, sorted by name.

use std::collections::BTreeMap;

use warden_core::WardenError;
use zeroize::Zeroizing;

use crate::crypto::NONCE_LEN;
use crate::kdf::{KdfParams, SALT_LEN};

pub const MAGIC: [u8; 4] = *b"WKS\x01";

/// Version written by this build.
pub const CURRENT_VERSION: u8 = 2;

/// Oldest version this build can read.
pub const LEGACY_VERSION: u8 = 1;

const FLAG_HAS_PASSWORD: u8 = 0x01;
const KDF_ARGON2ID: u8 = 1;
const KDF_PBKDF2_SHA256: u8 = 2;
const KIND_STRING: u8 = 0;
const KIND_FILE: u8 = 1;

/// Kind of value held by a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// ASCII string.
    String,
    /// Opaque bytes read from a file.
    File,
}

/// One decrypted setting value.
#[derive(Clone)]
pub struct Entry {
    pub kind: SettingKind,
    pub value: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("kind", &self.kind)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// The cleartext part of the file that precedes the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub has_password: bool,
    pub kdf: KdfParams,
    pub salt: [u8; SALT_LEN],
}

impl Header {
    /// Encode the authenticated prefix (everything before the nonce).
    pub fn encode_prefix(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 3 + 12 + 1 + SALT_LEN);
        buf.extend_from_slice(&MAGIC);
        buf.push(self.version);
        buf.push(if self.has_password { FLAG_HAS_PASSWORD } else { 0 });
        let (id, a, b, c) = match self.kdf {
            KdfParams::Argon2id {
                memory_cost,
                iterations,
                parallelism,
            } => (KDF_ARGON2ID, memory_cost, iterations, parallelism),
            KdfParams::Pbkdf2Sha256 { iterations } => (KDF_PBKDF2_SHA256, iterations, 0, 0),
        };
        buf.push(id);
        buf.extend_from_slice(&a.to_be_bytes());
        buf.extend_from_slice(&b.to_be_bytes());
        buf.extend_from_slice(&c.to_be_bytes());
        buf.push(SALT_LEN as u8);
        buf.extend_from_slice(&self.salt);
        buf
    }

    /// Associated data bound to the ciphertext for this header's version.
    pub fn aad<'a>(&self, prefix: &'a [u8]) -> &'a [u8] {
        if self.version >= CURRENT_VERSION {
            prefix
        } else {
            &[]
        }
    }
}

/// A parsed keystore file: header plus the sealed payload.
#[derive(Debug, Clone)]
pub struct SealedFile {
    pub header: Header,
    /// Raw bytes of the authenticated prefix, as read.
    pub prefix: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedFile {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(self.prefix.len() + NONCE_LEN + 4 + self.ciphertext.len());
        buf.extend_from_slice(&self.prefix);
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&(self.ciphertext.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Parse a keystore file. Only the structure is checked; nothing is decrypted.
    pub fn decode(bytes: &[u8]) -> Result<Self, WardenError> {
        let mut r = Reader::new(bytes);

        if r.take(MAGIC.len())? != MAGIC.as_slice() {
            return Err(WardenError::Format(
                "not a warden keystore (bad magic)".to_string(),
            ));
        }
        let version = r.u8()?;
        if !(LEGACY_VERSION..=CURRENT_VERSION).contains(&version) {
            return Err(WardenError::Format(format!(
                "unsupported keystore format version {version} (expected {LEGACY_VERSION}..={CURRENT_VERSION})"
            )));
        }
        let flags = r.u8()?;
        if flags & !FLAG_HAS_PASSWORD != 0 {
            return Err(WardenError::Format(format!("unknown header flags {flags:#04x}")));
        }
        let kdf_id = r.u8()?;
        let (a, b, c) = (r.u32()?, r.u32()?, r.u32()?);
        let kdf = match kdf_id {
            KDF_ARGON2ID => KdfParams::Argon2id {
                memory_cost: a,
                iterations: b,
                parallelism: c,
            },
            KDF_PBKDF2_SHA256 => KdfParams::Pbkdf2Sha256 { iterations: a },
            other => {
                return Err(WardenError::Format(format!(
                    "unknown key derivation function id {other}"
                )));
            }
        };
        if (version == LEGACY_VERSION) != kdf.is_legacy() {
            return Err(WardenError::Format(format!(
                "key derivation function does not match format version {version}"
            )));
        }
        kdf.check_bounds()?;
        let salt_len = r.u8()? as usize;
        if salt_len != SALT_LEN {
            return Err(WardenError::Format(format!(
                "unexpected salt length {salt_len} (expected {SALT_LEN})"
            )));
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(r.take(SALT_LEN)?);
        let prefix = bytes[..r.pos].to_vec();

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(r.take(NONCE_LEN)?);
        let ct_len = r.u32()? as usize;
        let ciphertext = r.take(ct_len)?.to_vec();
        if !r.is_empty() {
            return Err(WardenError::Format(
                "trailing bytes after ciphertext".to_string(),
            ));
        }

        Ok(Self {
            header: Header {
                version,
                has_password: flags & FLAG_HAS_PASSWORD != 0,
                kdf,
                salt,
            },
            prefix,
            nonce,
            ciphertext,
        })
    }
}

/// Serialize settings into the cleartext payload.
pub fn encode_payload(entries: &BTreeMap<String, Entry>) -> Zeroizing<Vec<u8>> {
    let size = 4 + entries
        .iter()
        .map(|(name, entry)| 1 + 2 + name.len() + 4 + entry.value.len())
        .sum::<usize>();
    let mut buf = Zeroizing::new(Vec::with_capacity(size));
    buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (name, entry) in entries {
        buf.push(match entry.kind {
            SettingKind::String => KIND_STRING,
            SettingKind::File => KIND_FILE,
        });
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&(entry.value.len() as u32).to_be_bytes());
        buf.extend_from_slice(&entry.value);
    }
    buf
}

/// Parse a decrypted payload back into settings.
pub fn decode_payload(bytes: &[u8]) -> Result<BTreeMap<String, Entry>, WardenError> {
    let mut r = Reader::new(bytes);
    let count = r.u32()?;
    let mut entries = BTreeMap::new();

    for _ in 0..count {
        let kind = match r.u8()? {
            KIND_STRING => SettingKind::String,
            KIND_FILE => SettingKind::File,
            other => {
                return Err(WardenError::Format(format!("unknown setting kind {other}")));
            }
        };
        let name_len = r.u16()? as usize;
        let name = std::str::from_utf8(r.take(name_len)?)
            .map_err(|_| WardenError::Format("setting name is not UTF-8".to_string()))?
            .to_string();
        let value_len = r.u32()? as usize;
        let value = Zeroizing::new(r.take(value_len)?.to_vec());

        if entries.insert(name.clone(), Entry { kind, value }).is_some() {
            return Err(WardenError::Format(format!("duplicate setting [{name}]")));
        }
    }
    if !r.is_empty() {
        return Err(WardenError::Format(
            "trailing bytes after settings".to_string(),
        ));
    }

    Ok(entries)
}

/// Bounds-checked big-endian cursor.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WardenError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| WardenError::Format("keystore file is truncated".to_string()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, WardenError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, WardenError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, WardenError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }
}
