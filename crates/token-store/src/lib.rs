//! Pluggable storage for Imgur access tokens
//!
//! `TokenStore` is a key → `AccessToken` capability with `get`/`set`. The
//! gateway picks a concrete backend at startup by name through
//! `StorageRegistry`, so an unknown backend is rejected before any request is
//! served.
//!
//! Built-in backends:
//! - `memory`: process-local map, lost on restart
//! - `file`: JSON file written atomically, survives restarts

pub mod error;
pub mod file;
pub mod memory;
pub mod registry;

pub use error::{Error, Result};
pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;
pub use registry::{StorageOptions, StorageRegistry, StoreConstructor, StoreFuture};

use std::future::Future;
use std::pin::Pin;

use imgur_auth::AccessToken;

/// Key → access token storage.
///
/// Keys are plain strings chosen by configuration; the store does not derive
/// per-user keys. Uses `Pin<Box<dyn Future>>` return types for
/// dyn-compatibility (`Arc<dyn TokenStore>`).
pub trait TokenStore: Send + Sync {
    /// Backend name for logging and health reporting (e.g. "memory", "file")
    fn backend(&self) -> &str;

    /// Fetch the token stored under `key`, if any.
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AccessToken>>> + Send + 'a>>;

    /// Store `token` under `key`, replacing any previous value.
    fn set<'a>(
        &'a self,
        key: &'a str,
        token: AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
