//! The beacon telemetry SDK core: the endpoint descriptor, the thread-safe
//! scope, the hub, the envelope codec, the rate-limit ledger, the
//! asynchronous delivery worker, the POSIX crash marker, and the client
//! facade that wires them together. Concrete transport backends (HTTP,
//! in-memory, file, fanout) live under [`transport`]; the HTTPS backend
//! itself ships in the sibling `beacon-http` crate to keep this crate free
//! of a concrete HTTP client dependency.

mod client;
mod config;
#[cfg(unix)]
mod crash;
#[cfg(not(unix))]
mod crash {
    //! The crash marker is a POSIX signal-handler contract (spec.md §4.10);
    //! on non-Unix targets there is no signal to hook, so installation is a
    //! no-op and there is never a marker to replay.
    use crate::model::Event;

    pub fn install(_cache_dir: &std::path::Path) {}
    pub fn uninstall() {}
    pub fn replay(_cache_dir: &std::path::Path) -> Option<Event> {
        None
    }
}
mod descriptor;
mod envelope;
mod error;
mod hub;
mod model;
mod ratelimit;
mod scope;
mod time;
pub mod transport;
mod worker;

pub use client::{Client, ClientInner};
pub use config::{BeforeBreadcrumb, BeforeSend, ClientOptions, SamplingContext, SessionMode, TracesSampler};
pub use descriptor::EndpointDescriptor;
pub use envelope::{Envelope, Item, SDK_NAME, SDK_VERSION};
pub use error::{ClientError, DescriptorError, SdkError, SdkResult};
pub use hub::{DetachedHub, DetachedHubGuard, Hub};
pub use model::{
    Attachment, Breadcrumb, BreadcrumbRing, CheckIn, CheckInStatus, Dynamic, Event, Exception,
    ExceptionValues, Message, Session, SessionStatus, Span, SpanStatus, Transaction, User,
};
pub use ratelimit::{Category, RateLimiter};
pub use scope::{EventProcessor, Scope};
pub use time::Timestamp;
pub use worker::Worker;

pub mod crash_marker {
    //! Re-export of the crash-handler install/replay contract under a more
    //! descriptive path for callers that don't want to import the bare
    //! `crash` module name.
    pub use crate::crash::{install, replay, uninstall};
}
