use crate::config::SessionMode;
use crate::time::Timestamp;
use beacon_api::{Level, SessionId};
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Ok,
    Exited,
    Crashed,
    Abnormal,
    Errored,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Ok => "ok",
            SessionStatus::Exited => "exited",
            SessionStatus::Crashed => "crashed",
            SessionStatus::Abnormal => "abnormal",
            SessionStatus::Errored => "errored",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub session_id: SessionId,
    pub distinct_id: Option<String>,
    pub init: bool,
    pub started: Timestamp,
    pub timestamp: Timestamp,
    pub status: SessionStatus,
    pub errors: u32,
    pub release: Option<String>,
    pub environment: Option<String>,
    pub duration: Option<f64>,
    session_mode: SessionMode,
}

impl Session {
    pub fn start(release: Option<String>, environment: Option<String>, session_mode: SessionMode) -> Self {
        let now = Timestamp::now();
        Session {
            session_id: SessionId::new(),
            distinct_id: None,
            init: true,
            started: now,
            timestamp: now,
            status: SessionStatus::Ok,
            errors: 0,
            release,
            environment,
            duration: None,
            session_mode,
        }
    }

    /// Fold an event's severity into the session's state machine. Only
    /// `error`/`fatal` events count toward `errors` and flip `ok -> errored`;
    /// a fatal crash is applied separately via [`Self::crash`].
    pub fn record_event(&mut self, level: Level) {
        if level.is_error_or_worse() {
            self.errors += 1;
            if self.status == SessionStatus::Ok {
                self.status = SessionStatus::Errored;
            }
        }
        self.timestamp = Timestamp::now();
    }

    pub fn crash(&mut self) {
        self.status = SessionStatus::Crashed;
        self.close_now();
    }

    pub fn exit(&mut self) {
        self.status = SessionStatus::Exited;
        self.close_now();
    }

    pub fn abort(&mut self) {
        self.status = SessionStatus::Abnormal;
        self.close_now();
    }

    /// `request`-mode sessions are one-shot and their `duration` would just
    /// restate the request's own latency, so it's omitted on close; only
    /// `application`-mode sessions (the long-lived kind) report it.
    fn close_now(&mut self) {
        self.timestamp = Timestamp::now();
        if self.session_mode == SessionMode::Application {
            self.duration = Some(self.timestamp.saturating_sub(self.started).as_secs_f64());
        }
    }

    /// Hand-written (non-reflective) canonical encoding.
    pub fn to_json(&self) -> Value {
        let mut attrs = serde_json::Map::new();
        if let Some(release) = &self.release {
            attrs.insert("release".to_string(), json!(release));
        }
        if let Some(environment) = &self.environment {
            attrs.insert("environment".to_string(), json!(environment));
        }

        let mut obj = serde_json::Map::new();
        obj.insert("sid".to_string(), json!(self.session_id.to_string()));
        if let Some(did) = &self.distinct_id {
            obj.insert("did".to_string(), json!(did));
        }
        obj.insert("init".to_string(), json!(self.init));
        obj.insert("started".to_string(), json!(self.started.to_rfc3339()));
        obj.insert("timestamp".to_string(), json!(self.timestamp.to_rfc3339()));
        obj.insert("status".to_string(), json!(self.status.as_str()));
        obj.insert("errors".to_string(), json!(self.errors));
        if let Some(duration) = self.duration {
            obj.insert("duration".to_string(), json!((duration * 1000.0).round() / 1000.0));
        }
        obj.insert("attrs".to_string(), Value::Object(attrs));
        Value::Object(obj)
    }
}
