//! Authorization URL construction
//!
//! The browser is sent to Imgur's authorize endpoint with `response_type=code`.
//! Imgur redirects back to the callback URL registered for the application,
//! carrying the authorization code as the `code` query parameter.

use reqwest::Url;

use crate::constants::AUTHORIZE_PATH;
use crate::error::{Error, Result};

/// Parse the authorize endpoint under `base_url`.
pub fn authorize_endpoint(base_url: &str) -> Result<Url> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), AUTHORIZE_PATH);
    Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
}

/// Build the authorization URL for the given application.
///
/// `state` is an opaque value the caller may use for CSRF protection; Imgur
/// returns it unchanged alongside the code.
pub fn build_authorization_url(endpoint: &Url, client_id: &str, state: Option<&str>) -> String {
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("response_type", "code");
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }
    url.into()
}
