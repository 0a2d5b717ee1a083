use axum::Json;

use campusmatch_shared::types::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        "campusmatch-api",
        env!("CARGO_PKG_VERSION"),
    ))
}
