use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// The three entries the browser build kept in localStorage, as one record.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct TokenRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// Absolute expiry, milliseconds since epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    token_expiry: Option<u64>,
}

/// Sole owner of persisted token state. The authenticator writes through it,
/// the gateway client and session presenter read through it, nobody else
/// touches storage directly.
///
/// Expiry is stored but never enforced here - the store hands out whatever it
/// has and leaves rejection to the gateway. v2 could evict on read.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn expiry_ms(&self) -> Option<u64>;

    /// Overwrites the access token. A missing refresh token or expiry leaves
    /// the previously stored value in place (the provider does not always
    /// resend them). No validation of the token's shape happens at write time.
    fn save(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in_secs: Option<u64>,
    ) -> Result<()>;

    /// Removes all three entries. The logout path.
    fn clear(&self) -> Result<()>;
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn merge(existing: TokenRecord, access: &str, refresh: Option<&str>, expires_in: Option<u64>) -> TokenRecord {
    TokenRecord {
        access_token: Some(access.to_string()),
        refresh_token: refresh.map(str::to_string).or(existing.refresh_token),
        token_expiry: expires_in
            .map(|secs| now_ms() + secs * 1000)
            .or(existing.token_expiry),
    }
}

/// JSON file on disk, written with 0600 on unix so other users can't read
/// the tokens.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(home.join(".clinic-admin").join("tokens.json"))
    }

    // unreadable or corrupt file degrades to "no tokens", same as a browser
    // with cleared storage
    fn load(&self) -> TokenRecord {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            return TokenRecord::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(
                "Ignoring corrupt token file {}: {}",
                self.path.display(),
                e
            );
            TokenRecord::default()
        })
    }

    fn persist(&self, record: &TokenRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(record)?;

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn expiry_ms(&self) -> Option<u64> {
        self.load().token_expiry
    }

    fn save(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in_secs: Option<u64>,
    ) -> Result<()> {
        let record = merge(self.load(), access_token, refresh_token, expires_in_secs);
        self.persist(&record)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// In-memory store, for tests and for callers that don't want anything on disk.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<TokenRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.inner.lock().expect("token store lock").access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.lock().expect("token store lock").refresh_token.clone()
    }

    fn expiry_ms(&self) -> Option<u64> {
        self.inner.lock().expect("token store lock").token_expiry
    }

    fn save(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in_secs: Option<u64>,
    ) -> Result<()> {
        let mut guard = self.inner.lock().expect("token store lock");
        *guard = merge(guard.clone(), access_token, refresh_token, expires_in_secs);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().expect("token store lock") = TokenRecord::default();
        Ok(())
    }
}
