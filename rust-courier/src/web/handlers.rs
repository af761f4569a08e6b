//! HTTP endpoint handlers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Person Endpoint
// =============================================================================

/// Acknowledgement envelope returned by `POST /person`.
#[derive(Debug, Serialize)]
pub struct PersonAck {
    pub status: &'static str,
    pub data: Value,
}

/// Accept an arbitrary JSON document and echo it back.
///
/// There is no schema; any JSON value is accepted.
pub async fn receive_person(Json(data): Json<Value>) -> (StatusCode, Json<PersonAck>) {
    info!(data = %data, "person_received");
    println!("Received data: {}", data);

    (
        StatusCode::CREATED,
        Json(PersonAck {
            status: "received",
            data,
        }),
    )
}
