//! Named route redirects
//!
//! Route names decouple the middleware from the paths the host serves:
//! the middleware asks for `imgur.authenticate` and the redirector looks up
//! whichever path the configuration mounted it on.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::config::RoutesConfig;
use crate::error::AuthError;

/// Name of the route that starts the Imgur authorization flow
pub const AUTHENTICATE_ROUTE: &str = "imgur.authenticate";

/// Resolves route names to redirect responses.
#[derive(Debug, Clone)]
pub struct Redirector {
    routes: Arc<HashMap<String, String>>,
}

impl Redirector {
    pub fn new<I, K, V>(routes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn from_config(routes: &RoutesConfig) -> Self {
        Self::new([(AUTHENTICATE_ROUTE, routes.authenticate.as_str())])
    }

    /// Path mounted for `name`, if any.
    pub fn path(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }

    /// Redirect response to the route registered under `name`.
    pub fn route(&self, name: &str) -> Result<Response, AuthError> {
        self.path(name)
            .map(found)
            .ok_or_else(|| AuthError::UnknownRoute(name.to_owned()))
    }
}

/// 302 Found redirect to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
