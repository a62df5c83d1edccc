use login_portal::{
    AppState, CredentialService,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point, responsible for initializing configuration,
/// logging, the database pool, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & environment loading (fail-fast).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter setup. RUST_LOG takes priority, with sensible
    // defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "login_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize logging based on environment: pretty output locally,
    // JSON for ingestion by centralized log aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database initialization (Postgres) and schema migrations.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    // Instantiate the repository handle and the credential service on top.
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let service = CredentialService::new(repo);

    // 5. Unified state assembly.
    let app_state = AppState { service, config };
    let bind_addr = app_state.config.bind_addr.clone();

    // 6. Router and server startup.
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind listen address.");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
