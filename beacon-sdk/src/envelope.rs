//! Frames events, transactions, sessions, attachments and check-ins into
//! the newline-delimited envelope wire format:
//! `{envelope-header}\n{item-header}\n{payload}\n...{item-header}\n{payload}`
//! with no trailing newline after the very last payload byte.

use crate::time::Timestamp;
use beacon_api::EventId;
use serde_json::json;

pub const SDK_NAME: &str = "beacon-rust";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One item inside an envelope, already canonically encoded.
pub enum Item {
    Event(Vec<u8>),
    Transaction(Vec<u8>),
    Session(Vec<u8>),
    CheckIn(Vec<u8>),
    Attachment { filename: String, content_type: Option<String>, attachment_type: Option<String>, bytes: Vec<u8> },
}

impl Item {
    fn type_name(&self) -> &'static str {
        match self {
            Item::Event(_) => "event",
            Item::Transaction(_) => "transaction",
            Item::Session(_) => "session",
            Item::CheckIn(_) => "check_in",
            Item::Attachment { .. } => "attachment",
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            Item::Event(b) | Item::Transaction(b) | Item::Session(b) | Item::CheckIn(b) => b,
            Item::Attachment { bytes, .. } => bytes,
        }
    }

    fn header_json(&self) -> Vec<u8> {
        let mut obj = serde_json::Map::new();
        obj.insert("type".to_string(), json!(self.type_name()));
        obj.insert("length".to_string(), json!(self.payload().len()));
        if let Item::Attachment { filename, content_type, attachment_type, .. } = self {
            obj.insert("filename".to_string(), json!(filename));
            if let Some(ct) = content_type {
                obj.insert("content_type".to_string(), json!(ct));
            }
            if let Some(at) = attachment_type {
                obj.insert("attachment_type".to_string(), json!(at));
            }
        }
        serde_json::to_vec(&serde_json::Value::Object(obj)).expect("envelope item header always serializes")
    }
}

/// An envelope header carries `event_id` only when at least one contained
/// item is an event or transaction.
pub struct Envelope {
    event_id: Option<EventId>,
    dsn: String,
    items: Vec<Item>,
}

impl Envelope {
    pub fn new(dsn: impl Into<String>) -> Self {
        Envelope { event_id: None, dsn: dsn.into(), items: Vec::new() }
    }

    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn push(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Byte-exact serialization. Item `length` headers equal the UTF-8 byte
    /// length of the payload that immediately follows them.
    pub fn serialize(&self) -> Vec<u8> {
        let mut header = serde_json::Map::new();
        if let Some(id) = self.event_id {
            header.insert("event_id".to_string(), json!(id.to_string()));
        }
        header.insert("dsn".to_string(), json!(self.dsn));
        header.insert("sent_at".to_string(), json!(Timestamp::now().to_rfc3339()));
        header.insert("sdk".to_string(), json!({ "name": SDK_NAME, "version": SDK_VERSION }));

        let mut out = serde_json::to_vec(&serde_json::Value::Object(header))
            .expect("envelope header always serializes");
        out.push(b'\n');

        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                out.push(b'\n');
            }
            out.extend_from_slice(&item.header_json());
            out.push(b'\n');
            out.extend_from_slice(item.payload());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_header_length_matches_payload_byte_length() {
        let payload = br#"{"level":"warning","message":{"formatted":"integration test message"}}"#.to_vec();
        let expected_len = payload.len();
        let envelope = Envelope::new("https://key@host/1").push(Item::Event(payload));
        let bytes = envelope.serialize();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.splitn(3, '\n').collect();
        assert!(lines[1].starts_with(&format!("{{\"type\":\"event\",\"length\":{expected_len}}}")));
    }

    #[test]
    fn scenario_two_from_the_spec() {
        let payload = br#"{"level":"warning","message":{"formatted":"integration test message"}}"#.to_vec();
        let envelope = Envelope::new("https://key@host/1")
            .with_event_id(EventId::new())
            .push(Item::Event(payload));
        let bytes = envelope.serialize();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.splitn(3, '\n').collect();
        assert!(lines[0].contains("\"event_id\""));
        assert!(lines[0].contains("\"dsn\""));
        assert!(lines[0].contains("\"sent_at\""));
        assert!(lines[0].contains(SDK_NAME));
        assert!(lines[1].starts_with("{\"type\":\"event\",\"length\":"));
        assert!(lines[2].contains("warning"));
        assert!(lines[2].contains("integration test message"));
    }

    #[test]
    fn session_only_envelope_has_no_event_id() {
        let envelope = Envelope::new("https://key@host/1").push(Item::Session(b"{}".to_vec()));
        let bytes = envelope.serialize();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert!(!header.contains("event_id"));
    }

    #[test]
    fn multiple_items_are_newline_separated_with_no_trailing_newline() {
        let envelope = Envelope::new("https://key@host/1")
            .push(Item::Session(b"{\"a\":1}".to_vec()))
            .push(Item::CheckIn(b"{\"b\":2}".to_vec()));
        let bytes = envelope.serialize();
        assert_eq!(bytes.last().copied(), Some(b'}'));
    }
}
