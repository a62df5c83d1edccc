use crate::{
    AppState,
    auth::{self, AuthSession},
    error::ServiceError,
    models::{
        AddUserRequest, AdminType, LoginRequest, MessageResponse, ReplaceUserRequest,
        SessionResponse, UpdateUserRequest, UserEntry,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

// --- Session Handlers ---

/// login
///
/// Verifies the submitted credentials against the record for the requested
/// admin type and, on success, opens a session by setting the fixed-expiry
/// session cookie.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = MessageResponse),
        (status = 400, description = "Missing or invalid fields", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (Some(username), Some(password), Some(admin_type)) =
        (&payload.username, &payload.password, &payload.admin_type)
    else {
        return Err(ServiceError::Validation("Missing fields".to_string()));
    };

    let verified_type = state
        .service
        .authenticate(username, password, admin_type)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        auth::login_cookie(&state.config, username, verified_type)?,
    );
    tracing::info!(%username, %verified_type, "login successful");
    Ok((StatusCode::OK, headers, message("Login successful")))
}

/// logout
///
/// Clears the session cookie. Always succeeds, even when no session exists;
/// there is no server-side session state to tear down.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Session cleared", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, auth::clear_session_cookie(&state.config));
    (StatusCode::OK, headers, message("Logged out"))
}

/// session
///
/// Reports the identity behind the current session cookie, letting the login
/// page restore its state after a reload. The `AuthSession` extractor
/// rejects absent or expired cookies with 401 before this handler runs.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Active session", body = SessionResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn session(session: AuthSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        username: session.username,
        admin_type: session.admin_type,
    })
}

// --- User Management Handlers ---

/// add_user
///
/// Creates credential records for a username, one per requested admin type.
/// `adminType` may be a single string or an array; a conflict on any
/// requested type rejects the whole call with nothing written.
#[utoipa::path(
    post,
    path = "/api/add-user",
    request_body = AddUserRequest,
    responses(
        (status = 201, description = "User(s) added", body = MessageResponse),
        (status = 400, description = "Missing or invalid fields", body = MessageResponse),
        (status = 409, description = "Duplicate username/admin type", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    )
)]
pub async fn add_user(
    State(state): State<AppState>,
    Json(payload): Json<AddUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (Some(username), Some(password), Some(admin_type)) =
        (&payload.username, &payload.password, &payload.admin_type)
    else {
        return Err(ServiceError::Validation("Missing fields".to_string()));
    };

    state.service.add_user(username, password, admin_type).await?;
    Ok((StatusCode::CREATED, message("User(s) added")))
}

/// get_users
///
/// Lists all credentials grouped by username, with each username's granted
/// admin types collected into one array.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Grouped user listing", body = [UserEntry]),
        (status = 500, description = "Server error", body = MessageResponse)
    )
)]
pub async fn get_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserEntry>>, ServiceError> {
    Ok(Json(state.service.list_users().await?))
}

/// delete_user
///
/// Removes every credential record held by a username, across all admin
/// types.
#[utoipa::path(
    delete,
    path = "/api/users/{username}",
    params(("username" = String, Path, description = "Username to delete")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.service.delete_user(&username, None).await?;
    Ok(message("User deleted"))
}

/// delete_user_type
///
/// Removes exactly one credential record, leaving any other admin-type
/// records of the same username untouched.
#[utoipa::path(
    delete,
    path = "/api/users/{username}/{admin_type}",
    params(
        ("username" = String, Path, description = "Username to delete"),
        ("admin_type" = String, Path, description = "Admin type of the record")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Invalid admin type", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    )
)]
pub async fn delete_user_type(
    State(state): State<AppState>,
    Path((username, admin_type)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let admin_type: AdminType = admin_type.parse()?;
    state.service.delete_user(&username, Some(admin_type)).await?;
    Ok(message("User deleted"))
}

/// update_user
///
/// Inline update of a single record identified by username and admin type.
/// Any of `newUsername`, `newPassword`, `newAdminType` may be supplied.
#[utoipa::path(
    put,
    path = "/api/users/{username}/{admin_type}",
    params(
        ("username" = String, Path, description = "Current username"),
        ("admin_type" = String, Path, description = "Current admin type")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, description = "Invalid fields", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 409, description = "Target key already exists", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path((username, admin_type)): Path<(String, String)>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let admin_type: AdminType = admin_type.parse()?;
    state
        .service
        .update_user(&username, admin_type, &payload)
        .await?;
    Ok(message("User updated"))
}

/// replace_user
///
/// Whole-username update: replaces every record of the target username with
/// one record per admin type in the new set, optionally renaming the user
/// and resetting the password.
#[utoipa::path(
    put,
    path = "/api/update-user",
    request_body = ReplaceUserRequest,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, description = "Invalid fields", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 409, description = "Target key already exists", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    )
)]
pub async fn replace_user(
    State(state): State<AppState>,
    Json(payload): Json<ReplaceUserRequest>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.service.replace_user(&payload).await?;
    Ok(message("User updated"))
}
