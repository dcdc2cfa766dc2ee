use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use keyring::Entry;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::APP_NAME;
use crate::models::UserRecord;

/// Fixed name of the persisted session record (file stem and keychain entry)
pub const STORAGE_NAME: &str = "auth-storage";

/// Keychain service name
const SERVICE_NAME: &str = "applylikeprince";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// The durable subset of the session. Pending and error state are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub user: Option<UserRecord>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// Where the session record lives between runs.
pub trait SessionStorage: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<PersistedSession>>;

    fn save(&self, session: &PersistedSession) -> Result<()>;
}

// ============================================================================
// Plain JSON file
// ============================================================================

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<dir>/auth-storage.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{}.json", STORAGE_NAME)))
    }

    /// `<data dir>/applylikeprince/auth-storage.json`
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not find data directory"))?;
        Ok(Self::in_dir(&data_dir.join(APP_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        let session = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let contents = serde_json::to_string_pretty(session)?;
        write_private(&self.path, contents.as_bytes())
    }
}

/// Write a file readable only by the current user where the platform allows it.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

// ============================================================================
// OS keychain
// ============================================================================

pub struct KeyringStorage {
    entry_name: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self {
            entry_name: STORAGE_NAME.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.entry_name).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let session = serde_json::from_str(&json)
                    .context("Failed to parse session from keychain")?;
                Ok(Some(session))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let json = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store session in keychain")
    }
}

// ============================================================================
// Passphrase-encrypted file
// ============================================================================

/// Session file sealed with ChaCha20-Poly1305.
///
/// The key is derived with Argon2 from a passphrase and a fresh random salt on
/// every save. Layout: `salt (16) | nonce (12) | ciphertext`.
pub struct EncryptedFileStorage {
    path: PathBuf,
    passphrase: String,
}

impl EncryptedFileStorage {
    pub fn new(path: PathBuf, passphrase: impl Into<String>) -> Self {
        Self {
            path,
            passphrase: passphrase.into(),
        }
    }

    /// `<dir>/auth-storage.bin`
    pub fn in_dir(dir: &Path, passphrase: impl Into<String>) -> Self {
        Self::new(dir.join(format!("{}.bin", STORAGE_NAME)), passphrase)
    }

    fn cipher(&self, salt: &[u8]) -> Result<ChaCha20Poly1305> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| anyhow!("Failed to derive session key: {}", e))?;
        Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
    }
}

impl SessionStorage for EncryptedFileStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read(&self.path).context("Failed to read session file")?;
        if contents.len() < SALT_LEN + NONCE_LEN {
            bail!("Session file is truncated");
        }

        let (salt, rest) = contents.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let plaintext = self
            .cipher(salt)?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt session file (wrong passphrase?)"))?;

        let session = serde_json::from_slice(&plaintext).context("Failed to parse session file")?;
        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let plaintext = serde_json::to_vec(session)?;

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| anyhow!("Failed to encrypt session"))?;

        let mut contents = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        contents.extend_from_slice(&salt);
        contents.extend_from_slice(&nonce);
        contents.extend_from_slice(&ciphertext);
        debug!(path = %self.path.display(), bytes = contents.len(), "Writing encrypted session");
        write_private(&self.path, &contents)
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    record: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PersistedSession) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        let record = self
            .record
            .lock()
            .map_err(|_| anyhow!("Session storage lock poisoned"))?;
        Ok(record.clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let mut record = self
            .record
            .lock()
            .map_err(|_| anyhow!("Session storage lock poisoned"))?;
        *record = Some(session.clone());
        Ok(())
    }
}
