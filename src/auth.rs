use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::{
    config::{AppConfig, Env},
    models::AdminType,
};

/// Name of the session cookie set on successful login.
pub const SESSION_COOKIE_NAME: &str = "portal_session";

/// Fixed session lifetime. Mirrors the original portal's 30-minute cookie;
/// there is no refresh, the cookie simply expires.
pub const SESSION_TTL_SECONDS: u64 = 30 * 60;

/// Failure while minting the session cookie.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("failed to build session cookie: {0}")]
    Header(#[from] header::InvalidHeaderValue),
}

/// Claims
///
/// The payload signed into the session token. The subject is the username;
/// the admin type records which administrative area this session was opened
/// for, so /api/session can report it back to the login page.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated username.
    pub sub: String,
    /// The admin type the credentials were verified against.
    pub admin_type: AdminType,
    /// Expiration timestamp. Fixed at issue time; never refreshed.
    pub exp: usize,
    /// Issued-at timestamp.
    pub iat: usize,
}

/// AuthSession
///
/// The identity resolved from a valid session cookie. Implemented as an
/// Axum extractor so any handler can take it as an argument; an absent,
/// expired, or tampered cookie rejects the request with 401 before the
/// handler runs.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub username: String,
    pub admin_type: AdminType,
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    // Allows the extractor to pull the AppConfig (for the session secret).
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token =
            extract_session_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.session_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(&token, &decoding_key, &validation)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        Ok(AuthSession {
            username: token_data.claims.sub,
            admin_type: token_data.claims.admin_type,
        })
    }
}

/// Pulls the session token out of the Cookie header, if present.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_string)
}

/// Signs a session token and wraps it into a `Set-Cookie` value with the
/// fixed expiry. `HttpOnly` keeps it away from page scripts; `Secure` is
/// appended outside the local environment.
pub fn login_cookie(
    config: &AppConfig,
    username: &str,
    admin_type: AdminType,
) -> Result<HeaderValue, SessionError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let claims = Claims {
        sub: username.to_string(),
        admin_type,
        iat: now as usize,
        exp: (now + SESSION_TTL_SECONDS) as usize,
    };

    let encoding_key = EncodingKey::from_secret(config.session_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &encoding_key)?;

    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECONDS}"
    );
    if config.env == Env::Production {
        cookie.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

/// Builds the `Set-Cookie` value that expires the session cookie
/// immediately. Sent unconditionally on logout, even when no session exists.
pub fn clear_session_cookie(config: &AppConfig) -> HeaderValue {
    if config.env == Env::Production {
        HeaderValue::from_static(
            "portal_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure",
        )
    } else {
        HeaderValue::from_static("portal_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}
