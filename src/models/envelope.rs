use super::Event;
use serde::{Deserialize, Serialize};

/// JSON body shared by every response: `{ "ok": bool, "rows"?: [...], "error"?: "..." }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Event>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub const fn ok() -> Self {
        Self {
            ok: true,
            rows: None,
            error: None,
        }
    }

    pub const fn rows(rows: Vec<Event>) -> Self {
        Self {
            ok: true,
            rows: Some(rows),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            rows: None,
            error: Some(message.into()),
        }
    }
}
