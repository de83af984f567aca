//! Imgur OAuth client library
//!
//! Provides the token endpoint calls (authorization code exchange and token
//! refresh), the `AccessToken` model with its expiry check, and the
//! request-scoped `Session` that the gateway middleware attaches tokens to.
//! The crate has no dependency on the gateway binary and can be tested on
//! its own.
//!
//! Token lifecycle:
//! 1. Browser is sent to `authorize::build_authorization_url()`
//! 2. Imgur redirects back with `?code=...`
//! 3. `Session::request_access_token()` exchanges the code via `ImgurApi`
//! 4. The caller persists `Session::get_access_token()` in its token store
//! 5. Later requests attach the stored token with `Session::set_access_token()`
//!    and call `Session::refresh_token()` once it has expired

pub mod authorize;
pub mod client;
pub mod constants;
pub mod error;
pub mod token;

pub use authorize::{authorize_endpoint, build_authorization_url};
pub use client::{ClientCredentials, HttpImgurClient, ImgurApi, Session};
pub use constants::*;
pub use error::{Error, Result};
pub use token::{AccessToken, exchange_code, refresh_token};
