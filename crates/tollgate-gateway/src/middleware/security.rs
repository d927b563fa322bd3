//! Request replay protection.
//!
//! Every `/api/v1` request must carry a fresh timestamp, an unused nonce and a
//! signature over its parameters. Parameters are gathered from several places,
//! later sources overwriting earlier ones:
//!
//! 1. URL query (first value per key)
//! 2. URL-encoded form body, for non-GET requests
//! 3. Top-level string fields of a JSON body, for non-GET requests
//! 4. `X-Timestamp` / `X-Nonce` headers
//!
//! The signature comes from `X-Sign`, falling back to the `sign` parameter.
//! The body is buffered for this and handed back to the handler unchanged.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{OriginalUri, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;

use tollgate_accounts::AccountService;
use tollgate_auth::{AuthError, Params, SecurityService, SIGN_FIELD};

use crate::error::ApiError;
use crate::state::GatewayState;

/// Parameter carrying the request time in epoch milliseconds.
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Parameter carrying the nonce.
pub const NONCE_FIELD: &str = "nonce";
/// Header overriding [`TIMESTAMP_FIELD`].
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
/// Header overriding [`NONCE_FIELD`].
pub const NONCE_HEADER: &str = "x-nonce";
/// Header carrying the signature.
pub const SIGN_HEADER: &str = "x-sign";

/// The signed view of a request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignedParams {
    /// All collected parameters.
    pub params: Params,
    /// The presented signature, if any.
    pub sign: Option<String>,
}

/// Gather the signed parameters of a request.
#[must_use]
pub fn collect_params(parts: &Parts, body: &[u8]) -> SignedParams {
    let mut params = Params::new();

    if let Some(query) = parts.uri.query() {
        params.extend(first_values(url::form_urlencoded::parse(query.as_bytes())));
    }

    if parts.method != Method::GET && !body.is_empty() {
        match content_type(&parts.headers).as_deref() {
            Some("application/x-www-form-urlencoded") => {
                params.extend(first_values(url::form_urlencoded::parse(body)));
            }
            Some("application/json") => params.extend(json_string_fields(body)),
            _ => {}
        }
    }

    if let Some(ts) = header_value(&parts.headers, TIMESTAMP_HEADER) {
        params.insert(TIMESTAMP_FIELD.to_string(), ts);
    }
    if let Some(nonce) = header_value(&parts.headers, NONCE_HEADER) {
        params.insert(NONCE_FIELD.to_string(), nonce);
    }

    let sign =
        header_value(&parts.headers, SIGN_HEADER).or_else(|| params.get(SIGN_FIELD).cloned());

    SignedParams { params, sign }
}

fn first_values<'a, I>(pairs: I) -> Params
where
    I: Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
{
    let mut out = Params::new();
    for (key, value) in pairs {
        out.entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    out
}

/// Top-level string fields of a JSON object. Anything else is unsigned.
fn json_string_fields(body: &[u8]) -> Params {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect(),
        _ => Params::new(),
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn required<'a>(params: &'a Params, field: &str) -> Result<&'a str, AuthError> {
    params
        .get(field)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat(format!("missing {field}")))
}

/// Run the full check: timestamp, then nonce, then signature.
async fn check_request(
    security: &dyn SecurityService,
    signed: &SignedParams,
) -> Result<(), AuthError> {
    let timestamp = required(&signed.params, TIMESTAMP_FIELD)?;
    security.validate_timestamp(timestamp, Duration::ZERO)?;

    let nonce = required(&signed.params, NONCE_FIELD)?;
    security.validate_nonce(nonce).await?;

    let sign = signed
        .sign
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat(format!("missing {SIGN_FIELD}")))?;
    security.validate_signature(&signed.params, sign)
}

fn request_path(parts: &Parts) -> &str {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path())
}

/// Log a rejected request at the level its kind calls for.
fn reject(err: AuthError, parts: &Parts) -> ApiError {
    let method = &parts.method;
    let path = request_path(parts);

    match &err {
        AuthError::InvalidSignature => {
            tracing::warn!(target: "security", %method, path, "Request signature mismatch");
        }
        AuthError::NonceInvalidOrExpired => {
            tracing::warn!(target: "security", %method, path, "Nonce rejected");
        }
        AuthError::OutOfWindow { skew_ms, window_ms } => {
            tracing::info!(%method, path, skew_ms, window_ms, "Request timestamp out of window");
        }
        AuthError::InvalidFormat(reason) => {
            tracing::debug!(%method, path, reason = %reason, "Malformed security fields");
        }
        _ => {}
    }

    ApiError::from(err)
}

/// Middleware requiring a valid timestamp, nonce and signature.
///
/// # Errors
///
/// Rejects the request with the first failing check.
pub async fn require_security<A>(
    State(state): State<Arc<GatewayState<A>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    A: AccountService + 'static,
{
    let (parts, body) = request.into_parts();
    // Buffering fails on the length limit; anything else means the client
    // went away mid-body and never sees the status.
    let bytes: Bytes = axum::body::to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(|e| {
            tracing::debug!(path = request_path(&parts), error = %e, "Request body rejected");
            ApiError::PayloadTooLarge
        })?;

    let signed = collect_params(&parts, &bytes);
    check_request(state.security.as_ref(), &signed)
        .await
        .map_err(|e| reject(e, &parts))?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Middleware for the nonce-issuing endpoint, which only needs a timestamp.
///
/// # Errors
///
/// Rejects the request if the timestamp is missing, malformed or stale.
pub async fn require_timestamp<A>(
    State(state): State<Arc<GatewayState<A>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    A: AccountService + 'static,
{
    let (parts, body) = request.into_parts();

    let signed = collect_params(&parts, &[]);
    required(&signed.params, TIMESTAMP_FIELD)
        .and_then(|ts| state.security.validate_timestamp(ts, Duration::ZERO))
        .map_err(|e| reject(e, &parts))?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}
