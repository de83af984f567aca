//! Error types for Imgur OAuth operations

/// Errors from Imgur OAuth operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("grant rejected by Imgur: {0}")]
    InvalidGrant(String),

    #[error("no access token attached to session")]
    MissingToken,

    #[error("invalid Imgur URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Whether the authorization server refused the code or refresh token
    /// outright (as opposed to a transport or parse failure).
    pub fn is_rejected_grant(&self) -> bool {
        matches!(self, Error::InvalidGrant(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
