use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The endpoints the static login page talks to: credential verification,
/// session teardown, and session introspection, plus the health check used
/// by monitoring.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/login
        // Verifies credentials for the selected admin type and opens a
        // fixed-expiry session cookie.
        .route("/login", post(handlers::login))
        // POST /api/logout
        // Clears the session cookie unconditionally.
        .route("/logout", post(handlers::logout))
        // GET /api/session
        // Resolves the current session cookie so the page can restore state.
        .route("/session", get(handlers::session))
}
