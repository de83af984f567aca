//! In-memory token store

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use imgur_auth::AccessToken;
use tokio::sync::RwLock;
use tracing::debug;

use crate::TokenStore;
use crate::error::Result;

/// Process-local token store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl TokenStore for MemoryTokenStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AccessToken>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.tokens.read().await.get(key).cloned()) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        token: AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.tokens.write().await.insert(key.to_owned(), token);
            debug!(key, "stored token in memory");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(access: &str) -> AccessToken {
        AccessToken {
            access_token: access.into(),
            refresh_token: "rt".into(),
            expires_in: 3600,
            created_at: 1_700_000_000,
            token_type: None,
            scope: None,
            account_id: None,
            account_username: None,
        }
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let store = MemoryTokenStore::new();
        assert!(store.get("imgur_token").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn set_then_get_returns_latest_value() {
        let store = MemoryTokenStore::new();
        store.set("imgur_token", token("first")).await.unwrap();
        store.set("imgur_token", token("second")).await.unwrap();

        let stored = store.get("imgur_token").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "second");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = MemoryTokenStore::new();
        store.set("a", token("at_a")).await.unwrap();
        assert!(store.get("b").await.unwrap().is_none());
        assert_eq!(store.backend(), "memory");
    }
}
