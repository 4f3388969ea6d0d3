//! Session Credential storage
//!
//! `TokenStore` is the capability the gateway reads before every request and
//! writes after login or refresh. The gateway never keeps its own copy of the
//! token: whatever the store returns at dispatch time is what gets attached.
//!
//! Two implementations:
//! - `MemoryTokenStore` for tests and hosts that re-login on every start
//! - `FileTokenStore` persisting the token as JSON with atomic temp-file +
//!   rename writes, so a crash mid-write never leaves a half-written token

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Boxed future returned by `TokenStore` methods.
///
/// Boxed rather than `async fn` so the trait stays dyn-compatible
/// (`Arc<dyn TokenStore>`).
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Get/set/remove access to the bearer token.
pub trait TokenStore: Send + Sync {
    /// Current token, if any.
    fn get(&self) -> StoreFuture<'_, Option<Secret<String>>>;

    /// Replace the current token.
    fn set(&self, token: String) -> StoreFuture<'_, Result<()>>;

    /// Forget the current token. Removing an absent token is not an error.
    fn remove(&self) -> StoreFuture<'_, Result<()>>;
}

/// In-process token store.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<Secret<String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(Secret::new(token.into()))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.token.read().await.clone() })
    }

    fn set(&self, token: String) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.token.write().await = Some(Secret::new(token));
            Ok(())
        })
    }

    fn remove(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            self.token.write().await.take();
            Ok(())
        })
    }
}

/// On-disk shape of the session file.
///
/// `stored_at` is a unix timestamp in milliseconds, informational only: the
/// backend decides when a token has expired, not this file.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    stored_at: u64,
}

/// File-backed token store.
///
/// The Mutex serializes writes; reads clone the in-memory copy so a slow
/// disk never blocks request dispatch.
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<Option<Secret<String>>>,
}

impl FileTokenStore {
    /// Load the session file at `path`.
    ///
    /// A missing file is a cold start with no credential. The file is not
    /// created until the first `set`.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let token = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let stored: StoredToken = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            info!(path = %path.display(), "loaded session credential");
            Some(Secret::new(stored.token))
        } else {
            info!(path = %path.display(), "session file not found, starting signed out");
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(token),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.state.lock().await.clone() })
    }

    fn set(&self, token: String) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let stored = StoredToken {
                token,
                stored_at: now_millis(),
            };
            write_atomic(&self.path, &stored).await?;
            *state = Some(Secret::new(stored.token.clone()));
            debug!("stored session credential");
            Ok(())
        })
    }

    fn remove(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.take();
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "removed session file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing session file: {e}"))),
            }
        })
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Write the session file atomically with 0600 permissions (unix).
async fn write_atomic(path: &Path, stored: &StoredToken) -> Result<()> {
    let json = serde_json::to_string_pretty(stored)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    Ok(())
}
