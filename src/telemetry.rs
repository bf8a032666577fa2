//! Tracing subscriber setup.
//!
//! Hosts call [`init`] once at process start. The filter honors `RUST_LOG`
//! and defaults to `info`; span traces are captured via
//! [`tracing_error::ErrorLayer`] so setup failures carry their context.

use miette::Diagnostic;
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry bootstrap errors.
#[derive(Debug, Error, Diagnostic)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    #[diagnostic(code(lockstep::telemetry::init))]
    Init(String),
}

/// Installs the global tracing subscriber.
///
/// Idempotence is the caller's concern: a second call fails with
/// [`TelemetryError::Init`], which tests that share a process may ignore.
pub fn init() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|err| TelemetryError::Init(err.to_string()))
}
