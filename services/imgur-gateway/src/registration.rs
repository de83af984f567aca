//! Service registration
//!
//! Builds the process-wide Imgur client and token store exactly once. The
//! storage backend is chosen by the `token_storage` selector and resolved
//! through `StorageRegistry` during startup, so a misconfigured selector stops
//! the process before any request is served. Repeat calls to `register`
//! return the same instances.

use std::sync::Arc;

use imgur_auth::HttpImgurClient;
use token_store::{StorageOptions, StorageRegistry, TokenStore};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::ImgurConfig;
use crate::error::RegistrationError;

/// Registered singletons handed to the router.
#[derive(Clone)]
pub struct Services {
    pub client: Arc<HttpImgurClient>,
    pub store: Arc<dyn TokenStore>,
}

/// Holds the singletons once they have been built.
pub struct Container {
    registry: StorageRegistry,
    http: reqwest::Client,
    client: OnceCell<Arc<HttpImgurClient>>,
    store: OnceCell<Arc<dyn TokenStore>>,
}

impl Container {
    pub fn new(registry: StorageRegistry, http: reqwest::Client) -> Self {
        Self {
            registry,
            http,
            client: OnceCell::new(),
            store: OnceCell::new(),
        }
    }

    /// Build (first call) or return (later calls) the client and store.
    pub async fn register(&self, config: &ImgurConfig) -> Result<Services, RegistrationError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let credentials = config.credentials()?;
                let client = HttpImgurClient::new(
                    self.http.clone(),
                    config.api_base_url.clone(),
                    credentials,
                )?;
                Ok::<_, RegistrationError>(Arc::new(client))
            })
            .await?
            .clone();

        let store = self
            .store
            .get_or_try_init(|| async {
                let store = self
                    .registry
                    .resolve(
                        &config.token_storage,
                        StorageOptions {
                            path: config.storage_path.clone(),
                        },
                    )
                    .await?;
                info!(
                    selector = %config.token_storage,
                    storage_key = %config.storage_key,
                    "token storage registered"
                );
                Ok::<_, RegistrationError>(store)
            })
            .await?
            .clone();

        Ok(Services { client, store })
    }
}
