//! The three error kinds that cross the public boundary: descriptor parse
//! failures, client construction failures, and worker-facing outcomes.
//! Modeled on the SDK's own `thiserror`-derived error enum.

use std::time::Duration;
use thiserror::Error;

/// Why an endpoint descriptor string failed to parse.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DescriptorError {
    #[error("malformed descriptor")]
    MalformedDescriptor,
    #[error("missing credentials")]
    MissingCredentials,
    #[error("missing host")]
    MissingHost,
    #[error("missing project identifier")]
    MissingProject,
}

/// Why the client refused to construct.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid dsn: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("sample_rate must be finite and within [0, 1], got {0}")]
    InvalidSampleRate(f64),
    #[error("traces_sample_rate must be finite and within [0, 1], got {0}")]
    InvalidTracesSampleRate(f64),
    #[error("failed to construct transport: {0}")]
    Transport(String),
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir { path: String, #[source] source: std::io::Error },
}

/// Worker-facing outcome for operations that have a clear success/failure
/// answer (`flush`, `shutdown`), even though the capture pipeline itself is
/// best-effort and never surfaces errors to application call sites.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("worker already shut down")]
    AlreadyShutdown,
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("internal failure: {0}")]
    InternalFailure(String),
}

pub type SdkResult = Result<(), SdkError>;
