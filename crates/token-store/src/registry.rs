//! Selector → constructor registry for token store backends
//!
//! Configuration names a backend by string (`token_storage = "file"`). The
//! registry maps that name to a constructor and is consulted once at startup,
//! so a typo fails the process before the listener binds instead of on the
//! first request.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Backend-specific settings handed to every constructor.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Location of the token file (used by the `file` backend)
    pub path: PathBuf,
}

/// Future returned by a backend constructor.
pub type StoreFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn TokenStore>>> + Send>>;

/// Boxed async constructor for a token store backend.
pub type StoreConstructor = Arc<dyn Fn(StorageOptions) -> StoreFuture + Send + Sync>;

/// Named token store constructors.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    constructors: BTreeMap<String, StoreConstructor>,
}

impl StorageRegistry {
    /// Empty registry with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `memory` and `file` backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("memory", Arc::new(memory_store));
        registry.register("file", Arc::new(file_store));
        registry
    }

    /// Add or replace the constructor for `name`.
    pub fn register(&mut self, name: impl Into<String>, constructor: StoreConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered backend names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Construct the backend registered under `selector`.
    pub async fn resolve(
        &self,
        selector: &str,
        options: StorageOptions,
    ) -> Result<Arc<dyn TokenStore>> {
        let constructor = self
            .constructors
            .get(selector)
            .ok_or_else(|| Error::UnknownBackend {
                selector: selector.to_owned(),
                available: self.names().join(", "),
            })?;
        let store = constructor(options).await?;
        info!(backend = store.backend(), "token storage resolved");
        Ok(store)
    }
}

fn memory_store(_options: StorageOptions) -> StoreFuture {
    Box::pin(async { Ok::<_, Error>(Arc::new(MemoryTokenStore::new()) as Arc<dyn TokenStore>) })
}

fn file_store(options: StorageOptions) -> StoreFuture {
    Box::pin(async move {
        let store = FileTokenStore::load(options.path).await?;
        Ok::<_, Error>(Arc::new(store) as Arc<dyn TokenStore>)
    })
}
