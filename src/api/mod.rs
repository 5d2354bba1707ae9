//! JSON API routes
//!
//! - `GET  /api/parties`
//! - `POST /api/login-user`
//! - `POST /api/verify-and-vote`
//! - `POST /api/admin/login`
//! - `GET  /api/admin/summary`
//! - `GET  /api/health`

pub mod error;
pub mod handlers;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::server::AppState;
use handlers::{
    admin_login_handler, admin_summary_handler, health_handler, login_user_handler,
    parties_handler, verify_and_vote_handler,
};

pub use error::ApiError;
pub use types::{ApiResponse, HealthResponse};

/// Webcam captures arrive base64-encoded inside JSON
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router
///
/// The static frontend is mounted as the fallback when its directory exists.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let mut app = Router::new()
        .route("/api/parties", get(parties_handler))
        .route("/api/login-user", post(login_user_handler))
        .route("/api/verify-and-vote", post(verify_and_vote_handler))
        .route("/api/admin/login", post(admin_login_handler))
        .route("/api/admin/summary", get(admin_summary_handler))
        .route("/api/health", get(health_handler));

    let frontend = &state.config.data.frontend_dir;
    if frontend.is_dir() {
        app = app.fallback_service(ServeDir::new(frontend));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
