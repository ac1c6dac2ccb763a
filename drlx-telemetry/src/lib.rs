//! Observability utilities for DRLX tools.
//!
//! Binaries call [`init`] once at startup; libraries only emit `tracing`
//! events and never install a subscriber themselves.

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Directive used when neither `RUST_LOG` nor the caller supplies one.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Options for the global fmt subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingOptions {
    directive: String,
    with_target: bool,
    respect_env: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            directive: DEFAULT_DIRECTIVE.to_owned(),
            with_target: false,
            respect_env: true,
        }
    }
}

impl TracingOptions {
    /// Creates options with the default `info` directive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback filter directive (e.g. `"drlx_config=debug"`).
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    /// Shows or hides event targets.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Ignores `RUST_LOG` and always uses the configured directive.
    #[must_use]
    pub fn ignore_env(mut self) -> Self {
        self.respect_env = false;
        self
    }

    /// Returns the fallback filter directive.
    #[must_use]
    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Builds the filter: `RUST_LOG` when set and allowed, otherwise the
    /// configured directive.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured directive cannot be parsed.
    pub fn filter(&self) -> Result<EnvFilter> {
        if self.respect_env {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        EnvFilter::try_new(&self.directive)
            .with_context(|| format!("invalid tracing directive `{}`", self.directive))
    }
}

/// Installs the global fmt subscriber.
///
/// # Errors
///
/// Returns an error when the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init(options: &TracingOptions) -> Result<()> {
    let filter = options.filter()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(options.with_target)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
