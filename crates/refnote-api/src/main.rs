//! refnote-api - HTTP API server for refnote

mod collaborators;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use collaborators::{HeaderAuthenticator, HttpProfileLookup};
use refnote_core::{Authenticator, NotesConfig, NullProfileLookup, ProfileLookup, StorageMode};
use refnote_db::{Database, FilesystemStore};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state.
///
/// Collaborators are injected here at startup; handlers never reach for
/// globals or probe for optional services at request time.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<NotesConfig>,
    pub auth: Arc<dyn Authenticator>,
    pub profiles: Arc<dyn ProfileLookup>,
    pub files: FilesystemStore,
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Internal(refnote_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<refnote_core::Error> for ApiError {
    fn from(err: refnote_core::Error) -> Self {
        match err {
            refnote_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            refnote_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            refnote_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            refnote_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                // Log the cause, return a generic message to the client
                error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Parse ALLOWED_ORIGINS (comma-separated) into header values, defaulting to
/// localhost dev origins.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let raw = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

fn app(state: AppState) -> Router {
    let body_limit =
        state.config.files.max_file_size_bytes() as usize + 1024 * 1024; // multipart overhead

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/v1/notes/files",
            get(handlers::files::download_file).post(handlers::files::upload_file),
        )
        .route(
            "/api/v1/notes/:ref_id",
            get(handlers::notes::get_notes).post(handlers::notes::add_note),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "refnote_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "refnote_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("refnote-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/refnote".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    let config = Arc::new(NotesConfig::from_env());
    let mode_name = match config.storage.mode {
        StorageMode::Jsonb => "jsonb",
        StorageMode::Filesystem => "filesystem",
    };
    info!(
        storage_mode = mode_name,
        storage_root = %config.storage.root.display(),
        max_file_size_mb = config.files.max_file_size_mb,
        max_files_per_note = config.files.max_files_per_note,
        "Notes configuration loaded"
    );

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Initialize file storage and verify it works before serving traffic
    let files = FilesystemStore::new(&config.storage.root);
    if config.storage.mode == StorageMode::Filesystem {
        files
            .validate()
            .await
            .map_err(|e| anyhow::anyhow!("file storage validation failed: {}", e))?;
        info!(root = %config.storage.root.display(), "File storage validated");
    }

    // Collaborators
    let auth_header =
        std::env::var("REFNOTE_AUTH_HEADER").unwrap_or_else(|_| "x-user-id".to_string());
    let auth: Arc<dyn Authenticator> = Arc::new(HeaderAuthenticator::new(&auth_header));
    info!(header = %auth_header, "Header authenticator configured");

    let profiles: Arc<dyn ProfileLookup> = match std::env::var("REFNOTE_PROFILE_URL") {
        Ok(url) if !url.trim().is_empty() => {
            info!(url = %url, "Profile lookup configured");
            Arc::new(HttpProfileLookup::new(url))
        }
        _ => {
            info!("No profile service configured; notes render with placeholder authors");
            Arc::new(NullProfileLookup)
        }
    };

    let state = AppState {
        db,
        config,
        auth,
        profiles,
        files,
    };

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
