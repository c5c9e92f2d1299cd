use crate::models::{NewEvent, UNKNOWN_EVENT_TYPE};
use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Uri};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use tap::Tap;
use tracing::{debug, warn};

const FORWARDED_FOR: &str = "x-forwarded-for";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Header consulted for `path` when the body names none.
pub const DEFAULT_PATH_HEADER: &str = "x-vercel-deployment-url";

/// Deployment-dependent knobs of normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Checked between the body's `path` and the request URI.
    pub path_header: Option<HeaderName>,
    /// Store the whole decoded body as `payload` when it has no `payload` field.
    pub payload_from_body: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            path_header: Some(HeaderName::from_static(DEFAULT_PATH_HEADER)),
            payload_from_body: false,
        }
    }
}

impl NormalizeOptions {
    pub fn from_config(base: &eventlog_cfg::Config) -> Self {
        let path_header = base
            .path_header
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .and_then(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|error| warn!(name, %error, "Ignoring invalid path header"))
                    .ok()
            });
        Self {
            path_header,
            payload_from_body: base.payload_from_body,
        }
    }
}

/// Turns a raw request into an event candidate. Never fails: anything that
/// cannot be decoded falls back to the field defaults.
#[tracing::instrument(skip(headers, body), fields(body_len = body.len()))]
pub fn normalize(
    headers: &HeaderMap,
    uri: &Uri,
    remote: Option<SocketAddr>,
    body: &[u8],
    options: &NormalizeOptions,
) -> NewEvent {
    let fields = decode_body(headers.get(CONTENT_TYPE), body);

    NewEvent {
        event_type: text_field(&fields, "event_type")
            .or_else(|| Some(UNKNOWN_EVENT_TYPE.to_owned())),
        user_name: text_field(&fields, "user_name"),
        email: text_field(&fields, "email"),
        payload: Some(payload(&fields, options.payload_from_body)),
        ip: client_ip(headers, remote),
        ua: header_text(headers.get(USER_AGENT)),
        path: text_field(&fields, "path")
            .or_else(|| {
                options
                    .path_header
                    .as_ref()
                    .and_then(|name| header_text(headers.get(name)))
            })
            .or_else(|| uri.path_and_query().map(|pq| pq.as_str().to_owned())),
    }
    .tap(|event| debug!(?event, "Normalized event"))
}

fn payload(fields: &Map<String, Value>, from_body: bool) -> Value {
    match fields.get("payload").filter(|value| !value.is_null()) {
        Some(value) => value.clone(),
        None if from_body => Value::Object(fields.clone()),
        None => Value::Object(Map::new()),
    }
}

/// Decodes a body into a field mapping, using form decoding when the
/// content type says so and JSON otherwise.
pub fn decode_body(content_type: Option<&HeaderValue>, body: &[u8]) -> Map<String, Value> {
    if is_form(content_type) {
        decode_form(body)
    } else {
        decode_json(body)
    }
}

fn is_form(content_type: Option<&HeaderValue>) -> bool {
    content_type
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

fn decode_json(body: &[u8]) -> Map<String, Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Map::new();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        // Some clients send the document as a JSON string.
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        },
        Ok(other) => {
            debug!(kind = json_kind(&other), "Body is not an object, ignoring it");
            Map::new()
        }
        Err(error) => {
            debug!(%error, "Body is not valid JSON, ignoring it");
            Map::new()
        }
    }
}

fn decode_form(body: &[u8]) -> Map<String, Value> {
    url::form_urlencoded::parse(body)
        .map(|(key, value)| {
            let value = if key == "payload" {
                serde_json::from_str(&value).unwrap_or_else(|_| Value::String(value.into_owned()))
            } else {
                Value::String(value.into_owned())
            };
            (key.into_owned(), value)
        })
        .collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads a scalar field as text. Empty strings, nulls, arrays and objects
/// count as absent.
fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn header_text(value: Option<&HeaderValue>) -> Option<String> {
    value
        .and_then(|value| value.to_str().ok())
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// First entry of `X-Forwarded-For`, else the peer address.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Option<String> {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_owned)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
}
