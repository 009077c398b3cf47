//! `ClientOptions`: the configuration schema from which the client,
//! transport and worker are built. Every knob in the external-interface
//! table has a field here; the handful the teacher always makes
//! env-overridable get a `BEACON_*` variable read once at construction.

use crate::model::{Breadcrumb, Event};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Application,
    Request,
}

pub type BeforeSend = Arc<dyn Fn(Event) -> Option<Event> + Send + Sync>;
pub type BeforeBreadcrumb = Arc<dyn Fn(Breadcrumb) -> Option<Breadcrumb> + Send + Sync>;
pub type TracesSampler = Arc<dyn Fn(&SamplingContext) -> f64 + Send + Sync>;

/// Context handed to a `traces_sampler` override: enough to decide a
/// per-transaction sample rate without exposing the whole transaction.
pub struct SamplingContext {
    pub transaction_name: String,
    pub op: String,
    pub parent_sampled: Option<bool>,
}

#[derive(Clone)]
pub struct ClientOptions {
    pub dsn: String,
    pub release: Option<String>,
    pub environment: Option<String>,
    pub server_name: Option<String>,
    pub sample_rate: f64,
    pub traces_sample_rate: f64,
    pub traces_sampler: Option<TracesSampler>,
    pub max_breadcrumbs: usize,
    pub before_send: Option<BeforeSend>,
    pub before_breadcrumb: Option<BeforeBreadcrumb>,
    pub cache_dir: PathBuf,
    pub install_signal_handlers: bool,
    pub auto_session_tracking: bool,
    pub session_mode: SessionMode,
    pub shutdown_timeout: Duration,
    pub debug: bool,
}

impl ClientOptions {
    pub fn new(dsn: impl Into<String>) -> Self {
        ClientOptions {
            dsn: dsn.into(),
            release: None,
            environment: None,
            server_name: None,
            sample_rate: env_f64("BEACON_SAMPLE_RATE").unwrap_or(1.0),
            traces_sample_rate: env_f64("BEACON_TRACES_SAMPLE_RATE").unwrap_or(0.0),
            traces_sampler: None,
            max_breadcrumbs: env_usize("BEACON_MAX_BREADCRUMBS").unwrap_or(100),
            before_send: None,
            before_breadcrumb: None,
            cache_dir: std::env::temp_dir().join("beacon"),
            install_signal_handlers: true,
            auto_session_tracking: false,
            session_mode: SessionMode::Application,
            shutdown_timeout: Duration::from_millis(env_u64("BEACON_SHUTDOWN_TIMEOUT_MILLIS").unwrap_or(2000)),
            debug: false,
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_traces_sample_rate(mut self, rate: f64) -> Self {
        self.traces_sample_rate = rate;
        self
    }

    pub fn with_traces_sampler(mut self, sampler: TracesSampler) -> Self {
        self.traces_sampler = Some(sampler);
        self
    }

    pub fn with_max_breadcrumbs(mut self, max: usize) -> Self {
        self.max_breadcrumbs = max;
        self
    }

    pub fn with_before_send(mut self, hook: BeforeSend) -> Self {
        self.before_send = Some(hook);
        self
    }

    pub fn with_before_breadcrumb(mut self, hook: BeforeBreadcrumb) -> Self {
        self.before_breadcrumb = Some(hook);
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_install_signal_handlers(mut self, install: bool) -> Self {
        self.install_signal_handlers = install;
        self
    }

    pub fn with_auto_session_tracking(mut self, enabled: bool) -> Self {
        self.auto_session_tracking = enabled;
        self
    }

    pub fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
