//! Imgur authentication middleware
//!
//! Ensures a request carries a usable Imgur access token before it reaches
//! the downstream handler. Each request is evaluated fresh:
//!
//! 1. A token is stored under `storage_key` → attach it, refresh it once if
//!    it has expired, continue.
//! 2. Otherwise a `code` query parameter is present → exchange it, store the
//!    issued token under `storage_key`, attach it, continue.
//! 3. Otherwise → redirect to the `imgur.authenticate` route; the downstream
//!    handler does not run.
//!
//! A stored token wins over a code on the same request. Failures from the
//! store or the token endpoint are not retried; they become the response.
//! The attached token lives in a per-request `Session` inserted into the
//! request extensions, never on the shared client.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, Request, State};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use imgur_auth::{AccessToken, ImgurApi, Session};
use serde::Deserialize;
use token_store::TokenStore;
use tracing::{debug, info, instrument, warn};

use crate::error::AuthError;
use crate::metrics;
use crate::redirect::{AUTHENTICATE_ROUTE, Redirector};

/// Everything the middleware needs, passed explicitly at construction.
#[derive(Clone)]
pub struct AuthState {
    pub api: Arc<dyn ImgurApi>,
    pub store: Arc<dyn TokenStore>,
    pub redirector: Redirector,
    pub storage_key: Arc<str>,
    /// Write refreshed tokens back to the store. Off by default: only tokens
    /// issued for an authorization code are stored.
    pub persist_refreshed_tokens: bool,
}

/// How a request ended up authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Stored token was still valid
    Authenticated,
    /// Stored token had expired and was refreshed
    Refreshed,
    /// Token was issued for an authorization code on this request
    CodeExchanged,
}

impl AuthOutcome {
    pub fn label(self) -> &'static str {
        match self {
            AuthOutcome::Authenticated => "authenticated",
            AuthOutcome::Refreshed => "refreshed",
            AuthOutcome::CodeExchanged => "code_exchanged",
        }
    }
}

enum Authentication {
    Ready(Session, AuthOutcome),
    Redirect,
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

/// Axum middleware: install with `axum::middleware::from_fn_with_state`.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn authenticate_imgur(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let result = authenticate(&state, request.uri()).await;

    match result {
        Ok(Authentication::Ready(session, outcome)) => {
            metrics::record_auth_outcome(outcome.label(), started.elapsed().as_secs_f64());
            debug!(outcome = outcome.label(), "imgur session ready");
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Ok(Authentication::Redirect) => {
            metrics::record_auth_outcome("redirected", started.elapsed().as_secs_f64());
            info!("no stored token or authorization code, redirecting");
            match state.redirector.route(AUTHENTICATE_ROUTE) {
                Ok(response) => response,
                Err(e) => e.into_response(),
            }
        }
        Err(e) => {
            metrics::record_auth_outcome("failed", started.elapsed().as_secs_f64());
            warn!(error = %e, kind = e.kind(), "imgur authentication failed");
            e.into_response()
        }
    }
}

async fn authenticate(state: &AuthState, uri: &Uri) -> Result<Authentication, AuthError> {
    let mut session = Session::new(state.api.clone());

    if let Some(token) = state.store.get(&state.storage_key).await? {
        let outcome = authenticate_user(state, &mut session, token).await?;
        Ok(Authentication::Ready(session, outcome))
    } else if let Some(code) = callback_code(uri) {
        request_access(state, &mut session, &code).await?;
        Ok(Authentication::Ready(session, AuthOutcome::CodeExchanged))
    } else {
        Ok(Authentication::Redirect)
    }
}

/// Attach `token` and refresh it if it has expired.
async fn authenticate_user(
    state: &AuthState,
    session: &mut Session,
    token: AccessToken,
) -> Result<AuthOutcome, AuthError> {
    if !attach(session, token).await? {
        return Ok(AuthOutcome::Authenticated);
    }

    if state.persist_refreshed_tokens {
        let refreshed = session
            .get_access_token()
            .cloned()
            .ok_or(imgur_auth::Error::MissingToken)?;
        state.store.set(&state.storage_key, refreshed).await?;
        debug!(storage_key = %state.storage_key, "refreshed token persisted");
    }
    Ok(AuthOutcome::Refreshed)
}

/// Attach `token`, refreshing it once if it has expired. Returns whether a
/// refresh happened.
async fn attach(session: &mut Session, token: AccessToken) -> Result<bool, AuthError> {
    session.set_access_token(token);

    if !session.check_access_token_expired() {
        return Ok(false);
    }

    debug!("attached token expired, refreshing");
    session.refresh_token().await?;
    Ok(true)
}

/// Exchange `code`, attach the issued token and store it.
///
/// Exactly one store write: the issued token, or the refreshed one when the
/// issued token was already expired and refreshed tokens are persisted.
async fn request_access(
    state: &AuthState,
    session: &mut Session,
    code: &str,
) -> Result<(), AuthError> {
    session.request_access_token(code).await?;

    let issued = session
        .get_access_token()
        .cloned()
        .ok_or(imgur_auth::Error::MissingToken)?;
    let refreshed = attach(session, issued.clone()).await?;

    let token = match session.get_access_token() {
        Some(current) if refreshed && state.persist_refreshed_tokens => current.clone(),
        _ => issued,
    };
    let account = token.account_username.clone();
    state.store.set(&state.storage_key, token).await?;
    info!(
        storage_key = %state.storage_key,
        account = ?account,
        refreshed,
        "authorization code exchanged, token stored"
    );
    Ok(())
}

/// Non-empty `code` query parameter, if present. A malformed query string
/// counts as absent.
fn callback_code(uri: &Uri) -> Option<String> {
    Query::<CallbackParams>::try_from_uri(uri)
        .ok()
        .and_then(|Query(params)| params.code)
        .filter(|code| !code.is_empty())
}
