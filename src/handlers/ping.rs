use crate::models::Envelope;
use axum::response::IntoResponse;
use axum::Json;

#[tracing::instrument]
pub async fn ping_handler() -> impl IntoResponse {
    Json(Envelope::ok())
}
