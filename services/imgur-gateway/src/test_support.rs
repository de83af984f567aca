//! Test doubles for the Imgur client and token storage

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use imgur_auth::{AccessToken, ImgurApi};
use token_store::{MemoryTokenStore, TokenStore};

pub const STORAGE_KEY: &str = "imgur_token";

pub fn token(access: &str, created_at: u64, expires_in: u64) -> AccessToken {
    AccessToken {
        access_token: access.into(),
        refresh_token: format!("rt_{access}"),
        expires_in,
        created_at,
        token_type: Some("bearer".into()),
        scope: None,
        account_id: Some(1),
        account_username: Some("tester".into()),
    }
}

pub fn live_token(access: &str) -> AccessToken {
    token(access, imgur_auth::token::unix_now(), 3600)
}

pub fn expired_token(access: &str) -> AccessToken {
    token(access, 1_000, 3600)
}

/// Imgur client double that counts calls and issues predictable tokens.
#[derive(Default)]
pub struct MockImgur {
    pub exchanges: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub fail: bool,
    /// Exchanged codes yield tokens that are already expired
    pub issue_expired: bool,
}

impl MockImgur {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl ImgurApi for MockImgur {
    fn client_id(&self) -> &str {
        "test-client"
    }

    fn authorization_url(&self, state: Option<&str>) -> String {
        let endpoint = imgur_auth::authorize_endpoint("https://imgur.test").unwrap();
        imgur_auth::build_authorization_url(&endpoint, "test-client", state)
    }

    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = imgur_auth::Result<AccessToken>> + Send + 'a>> {
        Box::pin(async move {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(imgur_auth::Error::InvalidGrant("code expired".into()));
            }
            let access = format!("at_code_{code}");
            if self.issue_expired {
                return Ok(expired_token(&access));
            }
            Ok(live_token(&access))
        })
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = imgur_auth::Result<AccessToken>> + Send + 'a>> {
        Box::pin(async move {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(imgur_auth::Error::InvalidGrant("refresh revoked".into()));
            }
            Ok(live_token(&format!("at_refreshed_{refresh_token}")))
        })
    }
}

/// Token store double counting reads and writes over an in-memory map.
#[derive(Default)]
pub struct CountingStore {
    pub(crate) inner: MemoryTokenStore,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub fail_sets: bool,
}

impl CountingStore {
    /// Store pre-seeded with `token` under `key`; the seed is not counted.
    pub async fn with_token(key: &str, token: AccessToken) -> Arc<Self> {
        let store = Arc::new(Self::default());
        store.inner.set(key, token).await.unwrap();
        store
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub async fn stored(&self, key: &str) -> Option<AccessToken> {
        self.inner.get(key).await.unwrap()
    }
}

impl TokenStore for CountingStore {
    fn backend(&self) -> &str {
        "counting"
    }

    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = token_store::Result<Option<AccessToken>>> + Send + 'a>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        token: AccessToken,
    ) -> Pin<Box<dyn Future<Output = token_store::Result<()>> + Send + 'a>> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets {
            return Box::pin(async { Err(token_store::Error::Io("disk full".into())) });
        }
        self.inner.set(key, token)
    }
}
