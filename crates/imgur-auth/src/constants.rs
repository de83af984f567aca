//! Imgur OAuth endpoints
//!
//! Paths are relative to the API base URL so tests and self-hosted mocks can
//! point the client somewhere other than the public API.

/// Public Imgur API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.imgur.com";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Authorization endpoint the browser is redirected to
pub const AUTHORIZE_PATH: &str = "/oauth2/authorize";
