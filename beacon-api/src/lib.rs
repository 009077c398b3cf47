//! Vendor-neutral types shared by every call site that talks to the beacon
//! telemetry SDK: event/trace identifiers, severity levels, and the inbound
//! trace-propagation header formats (`sentry-trace`, W3C `traceparent`,
//! `baggage`). This crate has no I/O and spawns no threads; it exists so
//! that instrumentation libraries can depend on the wire vocabulary without
//! pulling in the hub, the worker, or a transport.

mod ids;
mod level;
mod macros;
mod propagation;

pub use ids::{CheckInId, EventId, SessionId, SpanId};
pub use level::Level;
pub use propagation::{Baggage, SentryTrace, TraceParent, TraceParentError};
