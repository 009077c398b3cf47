use crate::time::Timestamp;
use beacon_api::{EventId, SpanId};
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    InternalError,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl SpanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SpanStatus::Ok => "ok",
            SpanStatus::Cancelled => "cancelled",
            SpanStatus::Unknown => "unknown",
            SpanStatus::InvalidArgument => "invalid_argument",
            SpanStatus::DeadlineExceeded => "deadline_exceeded",
            SpanStatus::NotFound => "not_found",
            SpanStatus::AlreadyExists => "already_exists",
            SpanStatus::PermissionDenied => "permission_denied",
            SpanStatus::ResourceExhausted => "resource_exhausted",
            SpanStatus::FailedPrecondition => "failed_precondition",
            SpanStatus::Aborted => "aborted",
            SpanStatus::OutOfRange => "out_of_range",
            SpanStatus::Unimplemented => "unimplemented",
            SpanStatus::InternalError => "internal_error",
            SpanStatus::Unavailable => "unavailable",
            SpanStatus::DataLoss => "data_loss",
            SpanStatus::Unauthenticated => "unauthenticated",
        }
    }
}

/// A child span: same trace as its transaction, its own span id, a parent
/// span id pointing back up the tree.
#[derive(Clone, Debug)]
pub struct Span {
    pub trace_id: EventId,
    pub span_id: SpanId,
    pub parent_span_id: SpanId,
    pub op: String,
    pub description: Option<String>,
    pub status: Option<SpanStatus>,
    pub start_timestamp: Timestamp,
    pub timestamp: Option<Timestamp>,
}

impl Span {
    pub fn is_finished(&self) -> bool {
        self.timestamp.is_some()
    }

    fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("trace_id".to_string(), json!(self.trace_id.to_string()));
        obj.insert("span_id".to_string(), json!(self.span_id.to_string()));
        if !self.parent_span_id.is_nil() {
            obj.insert("parent_span_id".to_string(), json!(self.parent_span_id.to_string()));
        }
        obj.insert("op".to_string(), json!(self.op));
        if let Some(description) = &self.description {
            obj.insert("description".to_string(), json!(description));
        }
        obj.insert("start_timestamp".to_string(), json!(self.start_timestamp.as_secs_f64()));
        if let Some(ts) = self.timestamp {
            obj.insert("timestamp".to_string(), json!(ts.as_secs_f64()));
        }
        if let Some(status) = self.status {
            obj.insert("status".to_string(), json!(status.as_str()));
        }
        Value::Object(obj)
    }
}

/// A transaction is a root span plus its (already finished) children.
/// Unfinished spans are never emitted.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub trace_id: EventId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub parent_sampled: Option<bool>,
    pub op: String,
    pub name: String,
    pub description: Option<String>,
    pub start_timestamp: Timestamp,
    pub timestamp: Option<Timestamp>,
    pub status: Option<SpanStatus>,
    pub sampled: bool,
    pub release: Option<String>,
    pub environment: Option<String>,
    pub children: Vec<Span>,
}

impl Transaction {
    pub fn start(op: impl Into<String>, name: impl Into<String>) -> Self {
        Transaction {
            trace_id: EventId::new(),
            span_id: SpanId::new(),
            parent_span_id: None,
            parent_sampled: None,
            op: op.into(),
            name: name.into(),
            description: None,
            start_timestamp: Timestamp::now(),
            timestamp: None,
            status: None,
            sampled: true,
            release: None,
            environment: None,
            children: Vec::new(),
        }
    }

    pub fn start_child(&self, op: impl Into<String>) -> Span {
        Span {
            trace_id: self.trace_id,
            span_id: SpanId::new(),
            parent_span_id: self.span_id,
            op: op.into(),
            description: None,
            status: None,
            start_timestamp: Timestamp::now(),
            timestamp: None,
        }
    }

    pub fn finish(&mut self) {
        self.timestamp = Some(Timestamp::now());
        if self.status.is_none() {
            self.status = Some(SpanStatus::Ok);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Hand-written (non-reflective) canonical encoding, per the envelope
    /// codec's transaction payload shape.
    pub fn to_json(&self) -> Value {
        let mut trace_ctx = serde_json::Map::new();
        trace_ctx.insert("trace_id".to_string(), json!(self.trace_id.to_string()));
        trace_ctx.insert("span_id".to_string(), json!(self.span_id.to_string()));
        trace_ctx.insert("op".to_string(), json!(self.op));
        if let Some(status) = self.status {
            trace_ctx.insert("status".to_string(), json!(status.as_str()));
        }

        let mut contexts = serde_json::Map::new();
        contexts.insert("trace".to_string(), Value::Object(trace_ctx));

        let mut obj = serde_json::Map::new();
        obj.insert("type".to_string(), json!("transaction"));
        obj.insert("transaction".to_string(), json!(self.name));
        obj.insert("start_timestamp".to_string(), json!(self.start_timestamp.as_secs_f64()));
        if let Some(ts) = self.timestamp {
            obj.insert("timestamp".to_string(), json!(ts.as_secs_f64()));
        }
        obj.insert("contexts".to_string(), Value::Object(contexts));
        let spans: Vec<Value> = self.children.iter().filter(|s| s.is_finished()).map(Span::to_json).collect();
        obj.insert("spans".to_string(), Value::Array(spans));
        obj.insert("platform".to_string(), json!("other"));
        if let Some(release) = &self.release {
            obj.insert("release".to_string(), json!(release));
        }
        if let Some(environment) = &self.environment {
            obj.insert("environment".to_string(), json!(environment));
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_four_from_the_spec() {
        let mut txn = Transaction::start("http.server", "GET /api/users");
        let mut child = txn.start_child("db.query");
        child.timestamp = Some(Timestamp::now());
        child.status = Some(SpanStatus::Ok);
        txn.children.push(child);
        txn.finish();

        let json = txn.to_json();
        let child_json = &json["spans"][0];
        assert_eq!(json["contexts"]["trace"]["trace_id"], child_json["trace_id"]);
        assert_eq!(json["contexts"]["trace"]["span_id"], child_json["parent_span_id"]);
        assert_eq!(json["contexts"]["trace"]["status"], "ok");
        assert_eq!(child_json["status"], "ok");
    }

    #[test]
    fn unfinished_children_are_not_emitted() {
        let mut txn = Transaction::start("http.server", "GET /x");
        let unfinished = txn.start_child("db.query");
        txn.children.push(unfinished);
        txn.finish();
        let json = txn.to_json();
        assert_eq!(json["spans"].as_array().unwrap().len(), 0);
    }
}
