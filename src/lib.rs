use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, header},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

// Module for routing segregation (session endpoints vs credential CRUD).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point.
pub use config::AppConfig;
pub use repository::{CredentialRepository, InMemoryRepository, PostgresRepository, RepositoryState};
pub use service::CredentialService;

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the portal.
/// Aggregates every handler decorated with `#[utoipa::path]` and every schema
/// deriving `ToSchema`. The resulting JSON is served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login,
        handlers::logout,
        handlers::session,
        handlers::add_user,
        handlers::get_users,
        handlers::delete_user,
        handlers::delete_user_type,
        handlers::update_user,
        handlers::replace_user,
    ),
    components(
        schemas(
            models::AdminType,
            models::AdminTypeSelector,
            models::LoginRequest,
            models::AddUserRequest,
            models::UpdateUserRequest,
            models::ReplaceUserRequest,
            models::UserEntry,
            models::SessionResponse,
            models::MessageResponse,
        )
    ),
    tags(
        (name = "login-portal", description = "Admin login portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding the credential service and the
/// immutable configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// The credential service, wrapping the injected repository handle.
    pub service: CredentialService,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and extractors to selectively pull components from the
// shared AppState.

impl FromRef<AppState> for CredentialService {
    fn from_ref(app_state: &AppState) -> CredentialService {
        app_state.service.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's routing structure, the static login page, and
/// the observability layer stack, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly
    let api_routes = Router::new()
        .merge(public::public_routes())
        .merge(admin::admin_routes());

    let static_dir = state.config.static_dir.clone();
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // The JSON API the login page and admin tooling call.
        .nest("/api", api_routes)
        // Static assets: the login page itself at "/", its script and styles
        // from the static directory. Served as-is.
        .route_service("/", ServeFile::new(format!("{static_dir}/login.html")))
        .fallback_service(ServeDir::new(static_dir))
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID per request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle
                // in a span correlated by the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // 3d. Login and admin responses must never be cached.
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                )),
        )
        // 4. CORS layer (applied last).
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: includes the
/// `x-request-id` header in the structured logging metadata alongside the
/// HTTP method and URI, so every log line of a request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
