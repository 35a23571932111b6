//! Encrypted local credentials file.
//!
//! The file is a JSON envelope holding an AES-256-GCM ciphertext of the three
//! credential fields. The 32-byte key comes from `KEYWORDTOOL_MASTER_KEY`
//! (base64) or from a `master.key` file next to the credentials file, which is
//! generated on first save.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use searchad_api::CredentialSource;
use serde::{Deserialize, Serialize};

use super::sources::{CredentialFields, CredentialTier};
use super::CredentialError;

pub const MASTER_KEY_ENV: &str = "KEYWORDTOOL_MASTER_KEY";
/// Overrides the credentials file location.
pub const CREDENTIALS_FILE_ENV: &str = "KEYWORDTOOL_CREDENTIALS_FILE";

const CONFIG_DIR: &str = ".keywordtool";
const CREDENTIALS_FILE: &str = "credentials.enc";
const KEY_FILE: &str = "master.key";
const ENVELOPE_VERSION: u32 = 1;
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    nonce: String,
    ciphertext: String,
}

/// The encrypted credentials file and its key.
#[derive(Debug, Clone)]
pub struct EncryptedFileStore {
    path: PathBuf,
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `KEYWORDTOOL_CREDENTIALS_FILE` if set, otherwise
    /// `~/.keywordtool/credentials.enc`.
    pub fn from_env() -> Self {
        match std::env::var(CREDENTIALS_FILE_ENV) {
            Ok(p) if !p.trim().is_empty() => Self::new(p),
            _ => Self::new(Self::default_path()),
        }
    }

    pub fn default_path() -> PathBuf {
        home::home_dir()
            .unwrap_or_default()
            .join(CONFIG_DIR)
            .join(CREDENTIALS_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_path(&self) -> PathBuf {
        self.path.with_file_name(KEY_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Encrypts and writes the fields, replacing any existing file.
    pub fn save(&self, fields: &CredentialFields) -> Result<(), CredentialError> {
        let missing = fields.missing();
        if !missing.is_empty() {
            return Err(CredentialError::Incomplete(missing));
        }
        let fields = CredentialFields::new(&fields.customer_id, &fields.api_key, &fields.secret_key);

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let key = self.master_key(true)?.ok_or_else(|| self.corrupt("master key unavailable"))?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| self.corrupt(e))?;

        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let plaintext = serde_json::to_vec(&fields).map_err(|e| self.corrupt(e))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|_| self.corrupt("encryption failed"))?;

        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            nonce: BASE64_STANDARD.encode(nonce_bytes),
            ciphertext: BASE64_STANDARD.encode(ciphertext),
        };
        let body = serde_json::to_vec_pretty(&envelope).map_err(|e| self.corrupt(e))?;
        write_private(&self.path, &body)?;
        tracing::debug!("Saved encrypted credentials to {}", self.path.display());
        Ok(())
    }

    /// Reads and decrypts the file. `Ok(None)` when it does not exist.
    pub fn load(&self) -> Result<Option<CredentialFields>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path).map_err(|e| self.corrupt(e))?;
        let envelope: Envelope = serde_json::from_slice(&raw).map_err(|e| self.corrupt(e))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(self.corrupt(format!("unsupported version {}", envelope.version)));
        }

        let nonce = BASE64_STANDARD
            .decode(envelope.nonce.as_bytes())
            .map_err(|e| self.corrupt(format!("nonce: {}", e)))?;
        if nonce.len() != NONCE_LEN {
            return Err(self.corrupt("nonce has the wrong length"));
        }
        let ciphertext = BASE64_STANDARD
            .decode(envelope.ciphertext.as_bytes())
            .map_err(|e| self.corrupt(format!("ciphertext: {}", e)))?;

        let key = self
            .master_key(false)?
            .ok_or_else(|| self.corrupt("master key not found"))?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| self.corrupt(e))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| self.corrupt("decryption failed"))?;

        let fields: CredentialFields =
            serde_json::from_slice(&plaintext).map_err(|e| self.corrupt(e))?;
        Ok(Some(fields))
    }

    /// Deletes the credentials file and its generated key. Returns whether
    /// anything was removed.
    pub fn clear(&self) -> Result<bool, CredentialError> {
        let mut removed = remove_if_exists(&self.path)?;
        removed |= remove_if_exists(&self.key_path())?;
        if removed {
            tracing::debug!("Removed encrypted credentials at {}", self.path.display());
        }
        Ok(removed)
    }

    fn master_key(&self, create: bool) -> Result<Option<[u8; KEY_LEN]>, CredentialError> {
        if let Ok(encoded) = std::env::var(MASTER_KEY_ENV) {
            if !encoded.trim().is_empty() {
                return decode_key(encoded.trim())
                    .map(Some)
                    .ok_or_else(|| self.corrupt(format!("{} is not a base64 32-byte key", MASTER_KEY_ENV)));
            }
        }

        let key_path = self.key_path();
        if key_path.exists() {
            let encoded = fs::read_to_string(&key_path)
                .map_err(|e| self.corrupt(format!("master.key: {}", e)))?;
            return decode_key(encoded.trim())
                .map(Some)
                .ok_or_else(|| self.corrupt("master.key is not a base64 32-byte key"));
        }
        if !create {
            return Ok(None);
        }

        let key: [u8; KEY_LEN] = rand::random();
        write_private(&key_path, BASE64_STANDARD.encode(key).as_bytes())?;
        tracing::debug!("Generated master key at {}", key_path.display());
        Ok(Some(key))
    }

    fn corrupt(&self, reason: impl std::fmt::Display) -> CredentialError {
        CredentialError::StoreCorrupt {
            source_tier: CredentialSource::EncryptedFile,
            reason: format!("{}: {}", self.path.display(), reason),
        }
    }
}

impl CredentialTier for EncryptedFileStore {
    fn source(&self) -> CredentialSource {
        CredentialSource::EncryptedFile
    }

    fn load_fields(&self) -> Result<Option<CredentialFields>, CredentialError> {
        self.load()
    }
}

fn decode_key(encoded: &str) -> Option<[u8; KEY_LEN]> {
    BASE64_STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| <[u8; KEY_LEN]>::try_from(bytes.as_slice()).ok())
}

fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Writes `contents` to a file only the owner can read. New files are
/// created with mode 0600; an existing file is narrowed before any bytes land.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    let file = open_private(&mut options, path)?;
    write_all_synced(file, contents)
}

#[cfg(unix)]
fn open_private(options: &mut fs::OpenOptions, path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = options.mode(0o600).open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(options: &mut fs::OpenOptions, path: &Path) -> io::Result<fs::File> {
    options.open(path)
}

fn write_all_synced(mut file: fs::File, contents: &[u8]) -> io::Result<()> {
    file.write_all(contents)?;
    file.sync_all()
}
