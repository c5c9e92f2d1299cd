use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;

/// Value stored in `event_type` when the caller did not name one.
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// A stored event row. `id` and `created_at` are assigned by the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub event_type: Option<String>,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub payload: Option<Json<Value>>,
    pub ip: Option<String>,
    pub ua: Option<String>,
    pub path: Option<String>,
}

/// An event that has been normalized but not yet stored.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub event_type: Option<String>,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub payload: Option<Value>,
    pub ip: Option<String>,
    pub ua: Option<String>,
    pub path: Option<String>,
}

impl Default for NewEvent {
    fn default() -> Self {
        Self {
            event_type: Some(UNKNOWN_EVENT_TYPE.to_owned()),
            user_name: None,
            email: None,
            payload: Some(Value::Object(Map::new())),
            ip: None,
            ua: None,
            path: None,
        }
    }
}

impl NewEvent {
    pub fn into_event(self, id: i64, created_at: DateTime<Utc>) -> Event {
        Event {
            id,
            created_at,
            event_type: self.event_type,
            user_name: self.user_name,
            email: self.email,
            payload: self.payload.map(Json),
            ip: self.ip,
            ua: self.ua,
            path: self.path,
        }
    }
}
