//! Imgur API client and request-scoped sessions
//!
//! `HttpImgurClient` is built once at startup and shared across requests. It
//! holds only immutable state: the application credentials, a pooled
//! `reqwest::Client` and the API base URL. The token a request is working with
//! lives in a `Session`, created per request, so concurrent requests never
//! overwrite each other's attached token.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use common::Secret;
use tracing::{debug, info};

use crate::authorize::{authorize_endpoint, build_authorization_url};
use crate::error::{Error, Result};
use crate::token::{self, AccessToken};

/// Application credentials registered with Imgur.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

/// Network operations against the Imgur token endpoint.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn ImgurApi>`), so the gateway can swap in a test double.
pub trait ImgurApi: Send + Sync {
    /// Application client id, used to build the authorization URL.
    fn client_id(&self) -> &str;

    /// URL the browser should visit to grant access.
    fn authorization_url(&self, state: Option<&str>) -> String;

    /// Exchange a single-use authorization code for a token.
    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>>;

    /// Obtain a new token from a refresh token.
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>>;
}

/// `ImgurApi` backed by the real token endpoint over HTTP.
pub struct HttpImgurClient {
    http: reqwest::Client,
    base_url: String,
    authorize_endpoint: reqwest::Url,
    credentials: ClientCredentials,
}

impl HttpImgurClient {
    /// Fails if `base_url` does not yield a parseable authorize endpoint.
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        credentials: ClientCredentials,
    ) -> Result<Self> {
        let authorize_endpoint = authorize_endpoint(&base_url)?;
        info!(client_id = %credentials.client_id, %base_url, "imgur client configured");
        Ok(Self {
            http,
            base_url,
            authorize_endpoint,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ImgurApi for HttpImgurClient {
    fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    fn authorization_url(&self, state: Option<&str>) -> String {
        build_authorization_url(&self.authorize_endpoint, &self.credentials.client_id, state)
    }

    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>> {
        Box::pin(token::exchange_code(
            &self.http,
            &self.base_url,
            &self.credentials,
            code,
        ))
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>> {
        Box::pin(token::refresh_token(
            &self.http,
            &self.base_url,
            &self.credentials,
            refresh_token,
        ))
    }
}

/// Per-request view of the Imgur client with at most one attached token.
///
/// Mirrors the stateful client surface (`set_access_token`,
/// `check_access_token_expired`, `refresh_token`, `request_access_token`,
/// `get_access_token`) without sharing the attached token between requests.
#[derive(Clone)]
pub struct Session {
    api: Arc<dyn ImgurApi>,
    token: Option<AccessToken>,
}

impl Session {
    pub fn new(api: Arc<dyn ImgurApi>) -> Self {
        Self { api, token: None }
    }

    /// Attach a token, replacing any previously attached one.
    pub fn set_access_token(&mut self, token: AccessToken) {
        self.token = Some(token);
    }

    pub fn get_access_token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Bearer value of the attached token, if any.
    pub fn access_value(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.access_token.as_str())
    }

    /// Whether the attached token has expired. A session without a token
    /// reports expired.
    pub fn check_access_token_expired(&self) -> bool {
        self.token.as_ref().is_none_or(AccessToken::is_expired)
    }

    /// Refresh the attached token and attach the result.
    pub async fn refresh_token(&mut self) -> Result<&AccessToken> {
        let current = self.token.as_ref().ok_or(Error::MissingToken)?;
        debug!(account = ?current.account_username, "refreshing attached token");
        let refreshed = self.api.refresh(&current.refresh_token).await?;
        Ok(self.token.insert(refreshed))
    }

    /// Exchange an authorization code and attach the issued token.
    pub async fn request_access_token(&mut self, code: &str) -> Result<()> {
        let issued = self.api.exchange_code(code).await?;
        debug!(account = ?issued.account_username, "authorization code exchanged");
        self.token = Some(issued);
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.api.client_id())
            .field("token", &self.token)
            .finish()
    }
}
