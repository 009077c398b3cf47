//! Plain value types with canonical JSON encoders: events, breadcrumbs,
//! sessions, transactions/spans, attachments, and monitor check-ins.

mod attachment;
mod breadcrumb;
mod checkin;
mod event;
mod session;
mod transaction;
mod user;

pub use attachment::Attachment;
pub use breadcrumb::{Breadcrumb, BreadcrumbRing};
pub use checkin::{CheckIn, CheckInStatus};
pub use event::{Event, Exception, ExceptionValues, Message};
pub use session::{Session, SessionStatus};
pub use transaction::{Span, SpanStatus, Transaction};
pub use user::User;

/// Dynamic, string-keyed JSON value used for tags, extras, contexts and
/// breadcrumb data. `serde_json::Value` is already the canonical encoding
/// target, so it is reused directly rather than wrapped.
pub type Dynamic = serde_json::Value;
