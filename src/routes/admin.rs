use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// The credential-management CRUD surface. Record identity is the composite
/// (username, admin type) key, so the path shape selects the granularity:
/// `/users/{username}` touches every record of a username, while
/// `/users/{username}/{admin_type}` touches exactly one.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /api/add-user
        // Creates one record per requested admin type; `adminType` accepts a
        // single string or an array. Conflicts reject the whole call.
        .route("/add-user", post(handlers::add_user))
        // GET /api/users
        // The grouped listing: one entry per username with all granted types.
        .route("/users", get(handlers::get_users))
        // DELETE /api/users/{username}
        // Removes every record held by the username.
        .route("/users/{username}", delete(handlers::delete_user))
        // DELETE/PUT /api/users/{username}/{admin_type}
        // Single-record removal and the inline single-record update.
        .route(
            "/users/{username}/{admin_type}",
            delete(handlers::delete_user_type).put(handlers::update_user),
        )
        // PUT /api/update-user
        // Whole-username replace: new admin-type set, optional rename and
        // password reset, applied atomically.
        .route("/update-user", put(handlers::replace_user))
}
