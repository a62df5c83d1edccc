//! Router module index.
//!
//! Splits the API surface into the session-facing routes the login page
//! calls and the user-management CRUD routes the admin tooling calls. Both
//! are mounted together under `/api` by `create_router`.

/// Login/logout/session endpoints plus the health check.
pub mod public;

/// Credential CRUD endpoints (add, list, update, delete).
pub mod admin;
