// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keystore lifecycle: load, create, decrypt, mutate, and atomically save.
//!
//! A [`Keystore`] starts either unlocked (fresh from [`Keystore::create`]) or
//! locked (fresh from [`Keystore::load`], only the header is known). Settings
//! can only be read or changed once unlocked. Every save re-derives the key
//! from the supplied passphrase, re-encrypts the whole settings map, and
//! replaces the file with a single rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use warden_core::{Passphrase, WardenError};
use zeroize::Zeroizing;

use crate::crypto;
use crate::format::{self, Entry, Header, SealedFile, SettingKind, CURRENT_VERSION};
use crate::kdf::{self, KdfParams, SALT_LEN};

/// File name of the keystore inside the configuration directory.
pub const KEYSTORE_FILENAME: &str = "warden.keystore";

/// Reserved setting holding the installation-unique random seed.
pub const SEED_SETTING: &str = "keystore.seed";

const SEED_LEN: usize = 20;
const SEED_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const MAX_NAME_LEN: usize = 1024;

/// Owner applied to the keystore file on save (unix only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOwner {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

/// The keystore, locked or unlocked.
///
/// Debug output never includes setting values.
pub struct Keystore {
    version: u8,
    has_password: bool,
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    /// Last sealed state read from or written to disk.
    sealed: Option<SealedFile>,
    /// Decrypted settings; `None` while locked.
    entries: Option<BTreeMap<String, Entry>>,
    owner: Option<FileOwner>,
}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore")
            .field("version", &self.version)
            .field("has_password", &self.has_password)
            .field("kdf", &self.kdf)
            .field("locked", &self.entries.is_none())
            .finish()
    }
}

impl Keystore {
    /// Path of the keystore file inside `config_dir`.
    pub fn path(config_dir: &Path) -> PathBuf {
        config_dir.join(KEYSTORE_FILENAME)
    }

    /// Whether a keystore file exists in `config_dir`.
    pub fn exists(config_dir: &Path) -> bool {
        Self::path(config_dir).is_file()
    }

    /// Read the keystore header from `config_dir`.
    ///
    /// Returns `Ok(None)` when there is no keystore file. The returned keystore
    /// is locked.
    pub fn load(config_dir: &Path) -> Result<Option<Self>, WardenError> {
        let path = Self::path(config_dir);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WardenError::io(&path, "failed to read keystore", e)),
        };

        let sealed = SealedFile::decode(&bytes)?;
        let header = sealed.header.clone();
        if header.version < CURRENT_VERSION {
            warn!(
                path = %path.display(),
                version = header.version,
                "keystore uses a legacy format -- run `warden keystore upgrade`"
            );
        }
        debug!(path = %path.display(), version = header.version, "keystore loaded");

        Ok(Some(Self {
            version: header.version,
            has_password: header.has_password,
            kdf: header.kdf,
            salt: header.salt,
            sealed: Some(sealed),
            entries: None,
            owner: None,
        }))
    }

    /// Load the keystore, failing with [`WardenError::NotFound`] if it is absent.
    pub fn load_existing(config_dir: &Path) -> Result<Self, WardenError> {
        Self::load(config_dir)?.ok_or_else(|| WardenError::NotFound {
            path: Self::path(config_dir),
        })
    }

    /// Create a new, empty, unlocked keystore at the current format version.
    ///
    /// Nothing is written until [`Keystore::save`].
    pub fn create(kdf: KdfParams) -> Result<Self, WardenError> {
        Ok(Self {
            version: CURRENT_VERSION,
            has_password: false,
            kdf,
            salt: kdf::generate_salt()?,
            sealed: None,
            entries: Some(BTreeMap::new()),
            owner: None,
        })
    }

    /// Create a new keystore holding a random [`SEED_SETTING`] value.
    pub fn create_with_seed(kdf: KdfParams) -> Result<Self, WardenError> {
        let mut keystore = Self::create(kdf)?;
        let seed = generate_seed()?;
        keystore.set_string(SEED_SETTING, &seed)?;
        Ok(keystore)
    }

    /// Unlock the keystore with `passphrase`.
    ///
    /// Re-decrypting an unlocked keystore replaces the in-memory settings with
    /// the last saved state. A keystore that was never saved has nothing to
    /// decrypt and is left as is.
    pub fn decrypt(&mut self, passphrase: &Passphrase) -> Result<(), WardenError> {
        let Some(sealed) = &self.sealed else {
            return Ok(());
        };

        let header = &sealed.header;
        let key = kdf::derive_key(passphrase.as_bytes(), &header.salt, &header.kdf)?;
        let plaintext = crypto::open(
            &key,
            &sealed.nonce,
            header.aad(&sealed.prefix),
            &sealed.ciphertext,
        )?;
        let entries = format::decode_payload(&plaintext)?;

        debug!(settings = entries.len(), "keystore decrypted");
        self.entries = Some(entries);
        Ok(())
    }

    /// Whether the keystore was sealed with a non-empty passphrase.
    ///
    /// Read from the header; does not require decryption.
    pub fn has_password(&self) -> bool {
        self.has_password
    }

    pub fn is_locked(&self) -> bool {
        self.entries.is_none()
    }

    /// Format version of the file this keystore was read from (or will be written as).
    pub fn format_version(&self) -> u8 {
        self.version
    }

    /// Whether the on-disk format predates [`CURRENT_VERSION`].
    pub fn needs_upgrade(&self) -> bool {
        self.version < CURRENT_VERSION
    }

    /// Apply `owner` to the keystore file on every subsequent save.
    pub fn set_owner(&mut self, owner: FileOwner) {
        self.owner = Some(owner);
    }

    /// Names of all settings, sorted.
    pub fn setting_names(&self) -> Result<Vec<String>, WardenError> {
        Ok(self.entries()?.keys().cloned().collect())
    }

    pub fn contains(&self, name: &str) -> Result<bool, WardenError> {
        Ok(self.entries()?.contains_key(name))
    }

    /// Kind of the named setting, if present.
    pub fn kind(&self, name: &str) -> Result<Option<SettingKind>, WardenError> {
        Ok(self.entries()?.get(name).map(|e| e.kind))
    }

    /// Read a string setting.
    pub fn get_string(&self, name: &str) -> Result<SecretString, WardenError> {
        let entry = self.entry(name)?;
        if entry.kind != SettingKind::String {
            return Err(WardenError::Usage(format!(
                "Setting [{name}] is a file setting, not a string"
            )));
        }
        let value = std::str::from_utf8(&entry.value)
            .map_err(|_| WardenError::Format(format!("string setting [{name}] is not ASCII")))?;
        Ok(SecretString::from(value.to_owned()))
    }

    /// Read a file setting.
    pub fn get_file(&self, name: &str) -> Result<Zeroizing<Vec<u8>>, WardenError> {
        let entry = self.entry(name)?;
        if entry.kind != SettingKind::File {
            return Err(WardenError::Usage(format!(
                "Setting [{name}] is a string setting, not a file"
            )));
        }
        Ok(entry.value.clone())
    }

    /// Store an ASCII string setting, replacing any previous value.
    pub fn set_string(&mut self, name: &str, value: &str) -> Result<(), WardenError> {
        validate_name(name)?;
        if !value.is_ascii() {
            return Err(WardenError::InvalidValue(
                "String value must contain only ASCII".to_string(),
            ));
        }
        self.insert(
            name,
            Entry {
                kind: SettingKind::String,
                value: Zeroizing::new(value.as_bytes().to_vec()),
            },
        )
    }

    /// Store a file setting, replacing any previous value.
    pub fn set_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), WardenError> {
        validate_name(name)?;
        if u32::try_from(bytes.len()).is_err() {
            return Err(WardenError::InvalidValue(format!(
                "File for setting [{name}] is too large"
            )));
        }
        self.insert(
            name,
            Entry {
                kind: SettingKind::File,
                value: Zeroizing::new(bytes.to_vec()),
            },
        )
    }

    /// Remove a setting.
    pub fn remove(&mut self, name: &str) -> Result<(), WardenError> {
        if self.entries_mut()?.remove(name).is_none() {
            return Err(WardenError::Usage(format!(
                "Setting [{name}] does not exist in the keystore."
            )));
        }
        debug!(name = %name, "setting removed");
        Ok(())
    }

    /// Discard the salt so the next save derives a fresh key.
    ///
    /// Called when the passphrase changes.
    pub fn rekey(&mut self) -> Result<(), WardenError> {
        self.salt = kdf::generate_salt()?;
        debug!("keystore salt regenerated");
        Ok(())
    }

    /// Rewrite an unlocked legacy keystore at the current format version.
    ///
    /// The salt is regenerated since the key derivation function changes.
    /// Returns `false` without touching the file if no upgrade was needed.
    pub fn upgrade(
        &mut self,
        config_dir: &Path,
        passphrase: &Passphrase,
        kdf: KdfParams,
    ) -> Result<bool, WardenError> {
        self.entries()?;
        if !self.needs_upgrade() {
            return Ok(false);
        }
        if kdf.is_legacy() {
            return Err(WardenError::Usage(
                "cannot upgrade to a legacy key derivation function".to_string(),
            ));
        }

        let previous = (self.version, self.kdf, self.salt);
        self.version = CURRENT_VERSION;
        self.kdf = kdf;
        self.rekey()?;
        if let Err(e) = self.save(config_dir, passphrase) {
            (self.version, self.kdf, self.salt) = previous;
            return Err(e);
        }
        info!(from = previous.0, to = CURRENT_VERSION, "keystore format upgraded");
        Ok(true)
    }

    /// Encrypt and atomically write the keystore to `config_dir`.
    pub fn save(&mut self, config_dir: &Path, passphrase: &Passphrase) -> Result<(), WardenError> {
        self.stage(config_dir, passphrase)?.commit()
    }

    /// Encrypt the keystore into a temporary file next to the target.
    ///
    /// Nothing observable changes until [`StagedSave::commit`] renames the
    /// temporary file over the keystore. Dropping the stage removes the file.
    pub fn stage(
        &mut self,
        config_dir: &Path,
        passphrase: &Passphrase,
    ) -> Result<StagedSave<'_>, WardenError> {
        if self.version < CURRENT_VERSION {
            return Err(WardenError::Format(format!(
                "keystore format version {} is read-only -- run `warden keystore upgrade` first",
                self.version
            )));
        }
        let payload = format::encode_payload(self.entries()?);

        let header = Header {
            version: CURRENT_VERSION,
            has_password: !passphrase.is_empty(),
            kdf: self.kdf,
            salt: self.salt,
        };
        let prefix = header.encode_prefix();
        let key = kdf::derive_key(passphrase.as_bytes(), &header.salt, &header.kdf)?;
        let (ciphertext, nonce) = crypto::seal(&key, header.aad(&prefix), &payload)?;
        let sealed = SealedFile {
            header,
            prefix,
            nonce,
            ciphertext,
        };

        let path = Self::path(config_dir);
        let temp = write_temp(config_dir, &sealed.encode(), self.owner)?;

        Ok(StagedSave {
            keystore: self,
            sealed,
            temp,
            path,
        })
    }

    fn entries(&self) -> Result<&BTreeMap<String, Entry>, WardenError> {
        self.entries.as_ref().ok_or(WardenError::Locked)
    }

    fn entries_mut(&mut self) -> Result<&mut BTreeMap<String, Entry>, WardenError> {
        self.entries.as_mut().ok_or(WardenError::Locked)
    }

    fn entry(&self, name: &str) -> Result<&Entry, WardenError> {
        self.entries()?.get(name).ok_or_else(|| {
            WardenError::Usage(format!("Setting [{name}] does not exist in the keystore."))
        })
    }

    fn insert(&mut self, name: &str, entry: Entry) -> Result<(), WardenError> {
        let replaced = self.entries_mut()?.insert(name.to_string(), entry).is_some();
        debug!(name = %name, replaced, "setting stored");
        Ok(())
    }
}

/// An encrypted keystore written to a temporary file, awaiting the rename.
pub struct StagedSave<'a> {
    keystore: &'a mut Keystore,
    sealed: SealedFile,
    temp: NamedTempFile,
    path: PathBuf,
}

impl StagedSave<'_> {
    /// Atomically replace the keystore file with the staged one.
    pub fn commit(self) -> Result<(), WardenError> {
        let StagedSave {
            keystore,
            sealed,
            temp,
            path,
        } = self;

        temp.persist(&path)
            .map_err(|e| WardenError::io(&path, "failed to replace keystore", e.error))?;
        if let Some(parent) = path.parent() {
            sync_dir(parent);
        }

        keystore.version = sealed.header.version;
        keystore.has_password = sealed.header.has_password;
        keystore.sealed = Some(sealed);
        info!(path = %path.display(), protected = keystore.has_password, "keystore saved");
        Ok(())
    }

    /// Path of the temporary file holding the staged keystore.
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }
}

/// Write `bytes` to a fresh temporary file in `dir` with keystore permissions.
fn write_temp(dir: &Path, bytes: &[u8], owner: Option<FileOwner>) -> Result<NamedTempFile, WardenError> {
    fs::create_dir_all(dir)
        .map_err(|e| WardenError::io(dir, "failed to create config directory", e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".warden.keystore.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| WardenError::io(dir, "failed to create temporary keystore file", e))?;
    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| WardenError::io(temp.path(), "failed to write temporary keystore file", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o660))
            .map_err(|e| WardenError::io(temp.path(), "failed to set keystore permissions", e))?;
        if let Some(owner) = owner {
            std::os::unix::fs::chown(temp.path(), owner.uid, owner.gid)
                .map_err(|e| WardenError::io(temp.path(), "failed to set keystore owner", e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = owner;

    Ok(temp)
}

/// Flush the directory entry after a rename. Best effort.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Ok(handle) = fs::File::open(dir) {
            let _ = handle.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = dir;
}

/// Setting names are restricted to `[A-Za-z0-9_.-]`.
pub fn validate_name(name: &str) -> Result<(), WardenError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(WardenError::Usage(format!(
            "Setting name [{name}] does not match the allowed setting name pattern [A-Za-z0-9_\\-.]+"
        )))
    }
}

/// Generate the installation-unique seed value.
fn generate_seed() -> Result<Zeroizing<String>, WardenError> {
    let random = Zeroizing::new(crypto::random_bytes::<SEED_LEN>()?);
    let seed: String = random
        .iter()
        .map(|b| SEED_CHARS[(b & 0x3f) as usize] as char)
        .collect();
    Ok(Zeroizing::new(seed))
}
