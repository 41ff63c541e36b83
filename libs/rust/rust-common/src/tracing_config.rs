//! Tracing subscriber initialization.

use crate::PlatformError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Dependencies that are chatty at `info` and below.
const QUIET_TARGETS: &[&str] = &["hyper", "h2", "rustls", "redis", "reqwest"];

/// Tracing configuration for one service process.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Level for the service's own targets, overridden by `RUST_LOG`
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl TracingConfig {
    /// Configuration for `service_name` logging at `log_level`.
    #[must_use]
    pub fn new(service_name: impl Into<String>, log_level: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_level: log_level.into(),
            json_output: false,
        }
    }

    /// Switch between JSON and human-readable output.
    #[must_use]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.json_output = enabled;
        self
    }

    /// Filter directives used when `RUST_LOG` is unset.
    ///
    /// Transport and storage dependencies are held at `warn` so that request
    /// logs are not drowned out.
    #[must_use]
    pub fn directives(&self) -> String {
        std::iter::once(self.log_level.clone())
            .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> Result<EnvFilter, PlatformError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(self.directives())
            .map_err(|e| PlatformError::invalid_input(format!("log level '{}': {e}", self.log_level)))
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns `PlatformError::InvalidInput` for an unparseable level and
/// `PlatformError::Internal` if a subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), PlatformError> {
    let filter = config.filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_output {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.map_err(|e| PlatformError::Internal(e.to_string()))?;

    tracing::info!(service = %config.service_name, json = config.json_output, "Tracing initialized");
    Ok(())
}
