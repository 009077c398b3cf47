//! Internal diagnostic macros, modeled on the `otel_*!` family: thin
//! wrappers over `tracing` so that call sites never pay for string
//! formatting when no subscriber is listening. Intended for use inside the
//! SDK and its transports, not as a general application logging facility.

#[macro_export]
macro_rules! beacon_debug {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        { tracing::debug!(name: $name, target: env!("CARGO_PKG_NAME"), ""); }
        #[cfg(not(feature = "internal-logs"))]
        { let _ = $name; }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        { tracing::debug!(name: $name, target: env!("CARGO_PKG_NAME"), $($key = $value),+, ""); }
        #[cfg(not(feature = "internal-logs"))]
        { let _ = ($name, $($value),+); }
    };
}

#[macro_export]
macro_rules! beacon_warn {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        { tracing::warn!(name: $name, target: env!("CARGO_PKG_NAME"), ""); }
        #[cfg(not(feature = "internal-logs"))]
        { let _ = $name; }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        { tracing::warn!(name: $name, target: env!("CARGO_PKG_NAME"), $($key = $value),+, ""); }
        #[cfg(not(feature = "internal-logs"))]
        { let _ = ($name, $($value),+); }
    };
}

#[macro_export]
macro_rules! beacon_error {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        { tracing::error!(name: $name, target: env!("CARGO_PKG_NAME"), ""); }
        #[cfg(not(feature = "internal-logs"))]
        { let _ = $name; }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        { tracing::error!(name: $name, target: env!("CARGO_PKG_NAME"), $($key = $value),+, ""); }
        #[cfg(not(feature = "internal-logs"))]
        { let _ = ($name, $($value),+); }
    };
}
