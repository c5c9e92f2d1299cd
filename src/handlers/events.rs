use crate::models::{ApiError, Envelope, NewEvent, Route};
use crate::services::normalize::normalize;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, RawQuery, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::net::SocketAddr;
use tracing::info;

pub const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (ACCESS_CONTROL_ALLOW_METHODS, "GET,POST,OPTIONS"),
    (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

#[tracing::instrument(skip_all, fields(%method, %uri))]
pub async fn events_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let route = Route::from(&method);
    info!(%route, storage = route.touches_storage(), "Dispatching");

    let response = match route {
        Route::Preflight => Ok(StatusCode::NO_CONTENT.into_response()),
        Route::Append => match body {
            Ok(body) => {
                let remote = connect_info.map(|ConnectInfo(addr)| addr);
                let event = normalize(&headers, &uri, remote, &body, &state.normalize);
                append(&state, event).await
            }
            Err(rejection) => Err(ApiError::Body {
                status: rejection.status(),
                message: rejection.body_text(),
            }),
        },
        Route::List => list(&state, query.as_deref()).await,
        Route::Rejected => Err(ApiError::MethodNotAllowed),
    };
    (CORS_HEADERS, response)
}

async fn append(state: &AppState, event: NewEvent) -> Result<Response, ApiError> {
    state.events.append(event).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok())).into_response())
}

async fn list(state: &AppState, query: Option<&str>) -> Result<Response, ApiError> {
    let limit = query.and_then(limit_param);
    let rows = state.events.list(limit.as_deref()).await?;
    Ok((StatusCode::OK, Json(Envelope::rows(rows))).into_response())
}

/// First `limit` value of a query string; duplicates and junk are ignored.
fn limit_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "limit")
        .map(|(_, value)| value.into_owned())
}
