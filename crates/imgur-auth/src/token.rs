//! Access tokens and the Imgur token endpoint
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (completing the browser flow)
//! 2. Token refresh (when an attached token has expired)
//!
//! Both operations POST to `{base_url}/oauth2/token` with different grant
//! types. Imgur authenticates the application with `client_id` and
//! `client_secret` in the form body.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ClientCredentials;
use crate::constants::TOKEN_PATH;
use crate::error::{Error, Result};

/// An Imgur OAuth access token with enough metadata to decide expiry.
///
/// The token endpoint returns `expires_in` as a delta in seconds. `created_at`
/// is absent from that response and defaults to the time of deserialization,
/// so a freshly issued token is stamped on arrival while a token read back
/// from storage keeps its original stamp.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds the access token is valid for, counted from `created_at`
    pub expires_in: u64,
    /// Unix timestamp (seconds) at which the token was issued
    #[serde(default = "unix_now")]
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_username: Option<String>,
}

impl AccessToken {
    /// Unix timestamp (seconds) after which the token is no longer valid.
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.expires_in)
    }

    /// Whether the token has expired as of `now` (unix seconds).
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at()
    }

    /// Whether the token has expired as of the current wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("created_at", &self.created_at)
            .field("account_username", &self.account_username)
            .finish()
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Exchange an authorization code for a token.
///
/// The code is single-use; Imgur answers a replayed or expired code with 400.
pub async fn exchange_code(
    client: &reqwest::Client,
    base_url: &str,
    credentials: &ClientCredentials,
    code: &str,
) -> Result<AccessToken> {
    let url = token_url(base_url);
    debug!(%url, "exchanging authorization code");

    let response = client
        .post(&url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    read_token_response(response, "token exchange").await
}

/// Refresh an access token using its refresh token.
///
/// The refreshed token carries a new `created_at` stamp; Imgur may or may not
/// rotate the refresh token, so the returned value replaces the old one whole.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    credentials: &ClientCredentials,
    refresh: &str,
) -> Result<AccessToken> {
    let url = token_url(base_url);
    debug!(%url, "refreshing access token");

    let response = client
        .post(&url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    read_token_response(response, "token refresh").await
}

fn token_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), TOKEN_PATH)
}

async fn read_token_response(response: reqwest::Response, operation: &str) -> Result<AccessToken> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 400/401/403 means the code or refresh token was refused
        if matches!(status.as_u16(), 400 | 401 | 403) {
            return Err(Error::InvalidGrant(format!(
                "{operation} rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "{operation} returned {status}: {body}"
        )));
    }

    response
        .json::<AccessToken>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid {operation} response: {e}")))
}
