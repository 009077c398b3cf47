use beacon_api::CheckInId;
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckInStatus {
    Ok,
    Error,
    InProgress,
}

impl CheckInStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckInStatus::Ok => "ok",
            CheckInStatus::Error => "error",
            CheckInStatus::InProgress => "in_progress",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CheckIn {
    pub check_in_id: CheckInId,
    pub monitor_slug: String,
    pub status: CheckInStatus,
    pub environment: Option<String>,
    pub duration_secs: Option<f64>,
}

impl CheckIn {
    pub fn new(monitor_slug: impl Into<String>, status: CheckInStatus) -> Self {
        CheckIn {
            check_in_id: CheckInId::new(),
            monitor_slug: monitor_slug.into(),
            status,
            environment: None,
            duration_secs: None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("check_in_id".to_string(), json!(self.check_in_id.to_string()));
        obj.insert("monitor_slug".to_string(), json!(self.monitor_slug));
        obj.insert("status".to_string(), json!(self.status.as_str()));
        if let Some(environment) = &self.environment {
            obj.insert("environment".to_string(), json!(environment));
        }
        if let Some(duration) = self.duration_secs {
            obj.insert("duration".to_string(), json!(duration));
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_required_fields_only_by_default() {
        let check_in = CheckIn::new("nightly-backup", CheckInStatus::Ok);
        let json = check_in.to_json();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["monitor_slug"], "nightly-backup");
        assert!(json.get("environment").is_none());
    }
}
