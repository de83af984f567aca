//! JSON file token store
//!
//! Keeps a map of storage key → access token in memory and mirrors it to a
//! JSON file on every write. Writes go through a temp file + rename so a crash
//! mid-write never leaves a truncated file behind. A tokio Mutex serializes
//! concurrent writers.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use imgur_auth::AccessToken;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::TokenStore;
use crate::error::{Error, Result};

/// File-backed token store.
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<HashMap<String, AccessToken>>,
}

impl FileTokenStore {
    /// Load tokens from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}` so later loads and
    /// permission checks see a real file.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let tokens: HashMap<String, AccessToken> = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing token file: {e}")))?;
            info!(path = %path.display(), keys = tokens.len(), "loaded stored tokens");
            tokens
        } else {
            info!(path = %path.display(), "token file not found, starting with empty store");
            let tokens = HashMap::new();
            write_atomic(&path, &tokens).await?;
            tokens
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn backend(&self) -> &str {
        "file"
    }

    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AccessToken>>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        token: AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            // Memory only reflects what reached disk
            let mut next = state.clone();
            next.insert(key.to_owned(), token);
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(key, "stored token");
            Ok(())
        })
    }
}

/// Write the token map to `path` atomically with 0600 permissions.
async fn write_atomic(path: &Path, data: &HashMap<String, AccessToken>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Parse(format!("serializing tokens: {e}")))?;

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };

    let tmp_path = dir.join(format!(".imgur-tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted tokens");
    Ok(())
}
