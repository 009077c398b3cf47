//! Inbound trace-propagation header formats: the `sentry-trace` header, the
//! W3C `traceparent` header, and opportunistic `baggage` parsing. Grounded
//! on the W3C TraceContext propagator's validation rules (reject malformed
//! hex, reject all-zero identifiers, normalize case) but expressed against
//! this crate's own [`EventId`]/[`SpanId`] types rather than a `SpanContext`.

use crate::{EventId, SpanId};
use std::collections::HashMap;
use thiserror::Error;

const VERSION_MAX: u8 = 0xfe;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceParentError {
    #[error("traceparent header did not have four dash-separated parts")]
    WrongPartCount,
    #[error("traceparent version must be two lowercase hex characters")]
    InvalidVersion,
    #[error("traceparent version ff is forbidden")]
    ForbiddenVersion,
    #[error("traceparent version 00 does not allow trailing data")]
    UnexpectedTrailingData,
    #[error("trace id must be 32 hex characters")]
    InvalidTraceId,
    #[error("span id must be 16 hex characters")]
    InvalidSpanId,
    #[error("trace flags must be two hex characters")]
    InvalidFlags,
    #[error("trace id and span id may not both be zero")]
    AllZero,
    #[error("identifier contains uppercase hex characters")]
    UppercaseHex,
}

/// A decoded `traceparent` or `sentry-trace` header: which trace a new span
/// should join, whose span is its parent, and whether the upstream caller
/// already decided to sample it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceParent {
    pub trace_id: EventId,
    pub parent_span_id: SpanId,
    pub sampled: Option<bool>,
}

fn all_lowercase_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

impl TraceParent {
    /// Parse a W3C `traceparent` header value:
    /// `<version>-<trace-id>-<span-id>-<flags>`.
    pub fn parse_w3c(header: &str) -> Result<Self, TraceParentError> {
        let parts: Vec<&str> = header.split('-').collect();
        if parts.len() < 4 {
            return Err(TraceParentError::WrongPartCount);
        }
        let (version_s, trace_id_s, span_id_s, flags_s) = (parts[0], parts[1], parts[2], parts[3]);

        if version_s.len() != 2 || !all_lowercase_hex(version_s) {
            if version_s.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(TraceParentError::UppercaseHex);
            }
            return Err(TraceParentError::InvalidVersion);
        }
        let version = u8::from_str_radix(version_s, 16).map_err(|_| TraceParentError::InvalidVersion)?;
        if version > VERSION_MAX {
            return Err(TraceParentError::ForbiddenVersion);
        }
        if version == 0 && parts.len() != 4 {
            return Err(TraceParentError::UnexpectedTrailingData);
        }

        if trace_id_s.len() != 32 {
            return Err(TraceParentError::InvalidTraceId);
        }
        if trace_id_s.chars().any(|c| c.is_ascii_uppercase()) || span_id_s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(TraceParentError::UppercaseHex);
        }
        let trace_id = EventId::from_hex(trace_id_s).map_err(|_| TraceParentError::InvalidTraceId)?;

        if span_id_s.len() != 16 {
            return Err(TraceParentError::InvalidSpanId);
        }
        let parent_span_id = SpanId::from_hex(span_id_s).map_err(|_| TraceParentError::InvalidSpanId)?;

        if flags_s.len() != 2 || !all_lowercase_hex(flags_s) {
            return Err(TraceParentError::InvalidFlags);
        }
        let flags = u8::from_str_radix(flags_s, 16).map_err(|_| TraceParentError::InvalidFlags)?;

        if trace_id.is_nil() || parent_span_id.is_nil() {
            return Err(TraceParentError::AllZero);
        }

        Ok(TraceParent {
            trace_id,
            parent_span_id,
            sampled: Some(flags & 0x01 == 0x01),
        })
    }

    /// Parse a `sentry-trace` header value: `<trace_id>-<span_id>[-<sampled>]`.
    pub fn parse_sentry_trace(header: &str) -> Result<Self, TraceParentError> {
        let header = header.trim();
        let parts: Vec<&str> = header.split('-').collect();
        if parts.len() < 2 {
            return Err(TraceParentError::WrongPartCount);
        }
        let trace_id = EventId::from_hex(parts[0]).map_err(|_| TraceParentError::InvalidTraceId)?;
        let parent_span_id = SpanId::from_hex(parts[1]).map_err(|_| TraceParentError::InvalidSpanId)?;
        if trace_id.is_nil() || parent_span_id.is_nil() {
            return Err(TraceParentError::AllZero);
        }
        let sampled = match parts.get(2) {
            Some(&"1") => Some(true),
            Some(&"0") => Some(false),
            _ => None,
        };
        Ok(TraceParent { trace_id, parent_span_id, sampled })
    }

    /// Render as a `sentry-trace` header value.
    pub fn to_sentry_trace_header(&self) -> String {
        match self.sampled {
            Some(true) => format!("{}-{}-1", self.trace_id, self.parent_span_id),
            Some(false) => format!("{}-{}-0", self.trace_id, self.parent_span_id),
            None => format!("{}-{}", self.trace_id, self.parent_span_id),
        }
    }

    /// Render as a W3C `traceparent` header value with version `00`.
    pub fn to_w3c_header(&self) -> String {
        let flags: u8 = if self.sampled.unwrap_or(false) { 0x01 } else { 0x00 };
        format!("00-{}-{}-{:02x}", self.trace_id, self.parent_span_id, flags)
    }
}

/// Opportunistic parse of a `baggage` header, keeping only `sentry-`
/// prefixed members with their prefix stripped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Baggage {
    entries: HashMap<String, String>,
}

impl Baggage {
    pub fn parse(header: &str) -> Self {
        let mut entries = HashMap::new();
        for member in header.split(',') {
            let member = member.trim();
            if member.is_empty() {
                continue;
            }
            // Drop any property list (`;key=value`) after the baggage value.
            let kv = member.split(';').next().unwrap_or(member);
            let Some((key, value)) = kv.split_once('=') else { continue };
            let key = key.trim();
            let Some(stripped) = key.strip_prefix("sentry-") else { continue };
            let value = percent_decode(value.trim());
            entries.insert(stripped.to_string(), value);
        }
        Baggage { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""), 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Re-export alias matching the `sentry-trace` header name used elsewhere
/// in the wire vocabulary.
pub type SentryTrace = TraceParent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_traceparent() {
        let header = "00-0123456789abcdef0123456789abcdef-89abcdef01234567-01";
        let parsed = TraceParent::parse_w3c(header).unwrap();
        assert_eq!(format!("{}", parsed.trace_id), "0123456789abcdef0123456789abcdef");
        assert_eq!(format!("{}", parsed.parent_span_id), "89abcdef01234567");
        assert_eq!(parsed.sampled, Some(true));
    }

    #[test]
    fn rejects_version_ff() {
        let header = "ff-0123456789abcdef0123456789abcdef-89abcdef01234567-01";
        assert_eq!(TraceParent::parse_w3c(header), Err(TraceParentError::ForbiddenVersion));
    }

    #[test]
    fn rejects_all_zero_ids() {
        let header = "00-00000000000000000000000000000000-0000000000000000-01";
        assert_eq!(TraceParent::parse_w3c(header), Err(TraceParentError::AllZero));
    }

    #[test]
    fn rejects_uppercase_hex() {
        let header = "00-0123456789ABCDEF0123456789abcdef-89abcdef01234567-01";
        assert_eq!(TraceParent::parse_w3c(header), Err(TraceParentError::UppercaseHex));
    }

    #[test]
    fn version_00_rejects_trailing_data() {
        let header = "00-0123456789abcdef0123456789abcdef-89abcdef01234567-01-extra";
        assert_eq!(TraceParent::parse_w3c(header), Err(TraceParentError::UnexpectedTrailingData));
    }

    #[test]
    fn future_version_accepts_trailing_data() {
        let header = "01-0123456789abcdef0123456789abcdef-89abcdef01234567-01-extra";
        assert!(TraceParent::parse_w3c(header).is_ok());
    }

    #[test]
    fn parses_sentry_trace_with_and_without_sampled_flag() {
        let with_flag = TraceParent::parse_sentry_trace("0123456789abcdef0123456789abcdef-89abcdef01234567-1").unwrap();
        assert_eq!(with_flag.sampled, Some(true));
        let without_flag = TraceParent::parse_sentry_trace("0123456789abcdef0123456789abcdef-89abcdef01234567").unwrap();
        assert_eq!(without_flag.sampled, None);
    }

    #[test]
    fn baggage_keeps_only_sentry_prefixed_members() {
        let baggage = Baggage::parse("other-vendor-value=abc, sentry-release=1.0.0, sentry-trace_id=abc123");
        assert_eq!(baggage.get("release"), Some("1.0.0"));
        assert_eq!(baggage.get("trace_id"), Some("abc123"));
        assert_eq!(baggage.get("other-vendor-value"), None);
    }

    #[test]
    fn baggage_percent_decodes_values() {
        let baggage = Baggage::parse("sentry-environment=my%20env");
        assert_eq!(baggage.get("environment"), Some("my env"));
    }
}
