//! Web server module for the JSON echo endpoint.
//!
//! The server exposes:
//! - `POST /person`: accepts any JSON body and echoes it back with 201
//! - `GET /health`: liveness probe
//!
//! Bodies that are not JSON never reach the handler; axum's `Json` extractor
//! rejects them with a 4xx response.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, receive_person, HealthResponse, PersonAck};

/// Build the application router.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/person", post(receive_person))
        .layer(TraceLayer::new_for_http())
}
