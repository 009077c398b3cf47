use super::{Breadcrumb, Dynamic, User};
use crate::time::Timestamp;
use beacon_api::{EventId, Level};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub params: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Exception {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Dynamic>,
}

/// The reflective, null-omitting encoding of a captured event. Fields map
/// directly onto the public capture API; nothing here is computed lazily.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub event_id: EventId,

    #[serde(with = "crate::time::serde_timestamp")]
    pub timestamp: Timestamp,

    pub platform: String,

    pub level: Level,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    #[serde(skip_serializing_if = "Option::is_none", rename = "exception")]
    pub exception: Option<ExceptionValues>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra: BTreeMap<String, Dynamic>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub contexts: BTreeMap<String, Dynamic>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub breadcrumbs: Vec<Breadcrumb>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExceptionValues {
    pub values: Vec<Exception>,
}

impl Event {
    pub fn new(level: Level) -> Self {
        Event {
            event_id: EventId::new(),
            timestamp: Timestamp::now(),
            platform: "other".to_string(),
            level,
            logger: None,
            server_name: None,
            release: None,
            dist: None,
            environment: None,
            transaction: None,
            message: None,
            exception: None,
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
            contexts: BTreeMap::new(),
            user: None,
            breadcrumbs: Vec::new(),
            fingerprint: None,
        }
    }

    pub fn message(text: impl Into<String>, level: Level) -> Self {
        let mut event = Event::new(level);
        event.message = Some(Message { formatted: Some(text.into()), template: None, params: Vec::new() });
        event
    }

    pub fn exception(kind: impl Into<String>, value: impl Into<String>) -> Self {
        let mut event = Event::new(Level::Error);
        event.exception = Some(ExceptionValues {
            values: vec![Exception { kind: kind.into(), value: value.into(), module: None, stacktrace: None }],
        });
        event
    }

    pub fn is_error_or_worse(&self) -> bool {
        self.level.is_error_or_worse()
    }

    /// Canonical JSON encoding: null-omitting, stable key order.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_event_encodes_level_and_text() {
        let event = Event::message("integration test message", Level::Warning);
        let json = String::from_utf8(event.to_json().unwrap()).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("integration test message"));
    }

    #[test]
    fn null_fields_are_omitted() {
        let event = Event::new(Level::Info);
        let json = String::from_utf8(event.to_json().unwrap()).unwrap();
        assert!(!json.contains("\"logger\""));
        assert!(!json.contains("\"user\""));
    }
}
