use super::Envelope;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Missing database connection string. Tried {tried}")]
    Configuration { tried: String },
    #[error("invalid table name (expected: [A-Za-z_][A-Za-z0-9_]*, got: {got:?})")]
    InvalidTableName { got: String },
    #[error("table {table} has not been created")]
    MissingSchema { table: String },
    #[error("storage did not answer within {secs}s")]
    Timeout { secs: u64 },
    #[error("{source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },
}

/// Failures that end a request. Each one renders as `{ "ok": false, "error": ... }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Configuration { message: String },
    #[error("{source}")]
    Storage { source: StoreError },
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("No route {uri}")]
    NotFound { uri: String },
    #[error("{message}")]
    Body { status: StatusCode, message: String },
}

impl From<StoreError> for ApiError {
    fn from(source: StoreError) -> Self {
        match source {
            StoreError::Configuration { .. } => Self::Configuration {
                message: source.to_string(),
            },
            other => Self::Storage { source: other },
        }
    }
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Configuration { .. } | Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Body { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = ?self, "Request failed");
        } else {
            warn!(%status, error = %self, "Request rejected");
        }
        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}
