//! Builder pattern for relay configuration.
//!
//! Provides a fluent API for configuring and creating [`Relay`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use tokio::sync::mpsc;
//! use wsrelay::{Relay, Role};
//!
//! # async fn example() -> wsrelay::Result<()> {
//! let (tx, _rx) = mpsc::unbounded_channel();
//!
//! let relay = Relay::builder()
//!     .role(Role::Sender)
//!     .backend("ws://localhost:8081/prj2/websocket/b")
//!     .reply_timeout(Some(Duration::from_secs(5)))
//!     .outbound(tx)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::runtime::Handle;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::session::Outbound;
use crate::transport::Endpoint;
use crate::transport::endpoint::duration_ms;

use super::core::{Relay, RelaySettings};
use super::options::{RelayOptions, Role};

// ============================================================================
// RelayBuilder
// ============================================================================

/// Builder for configuring a [`Relay`] instance.
///
/// Use [`Relay::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct RelayBuilder {
    /// Plain settings.
    options: RelayOptions,
    /// Host-facing sink.
    outbound: Option<Outbound>,
    /// Runtime to spawn sessions on.
    runtime: Option<Handle>,
}

// ============================================================================
// RelayBuilder Implementation
// ============================================================================

impl RelayBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from loaded options.
    #[inline]
    #[must_use]
    pub fn from_options(options: RelayOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Sets the role.
    #[inline]
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.options.role = role;
        self
    }

    /// Sets the backend URL.
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., "ws://localhost:8081/prj2/websocket/a")
    #[inline]
    #[must_use]
    pub fn backend(mut self, url: impl Into<String>) -> Self {
        self.options.backend_url = Some(url.into());
        self
    }

    /// Sets how many connections a receiver opens in the background at startup.
    #[inline]
    #[must_use]
    pub fn pre_warm(mut self, count: usize) -> Self {
        self.options.pre_warm = count;
        self
    }

    /// Sets the largest decompressed reply accepted, in bytes.
    #[inline]
    #[must_use]
    pub fn max_capacity(mut self, bytes: usize) -> Self {
        self.options.max_capacity = bytes;
        self
    }

    /// Sets how many receiver sessions may run at once.
    #[inline]
    #[must_use]
    pub fn max_workers(mut self, count: usize) -> Self {
        self.options.max_workers = count;
        self
    }

    /// Sets the connect timeout. `None` waits without limit.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.connect_timeout_ms = timeout.map(duration_ms);
        self
    }

    /// Sets the reply timeout. `None` waits without limit.
    #[inline]
    #[must_use]
    pub fn reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.reply_timeout_ms = timeout.map(duration_ms);
        self
    }

    /// Sets the channel results are reported on.
    #[inline]
    #[must_use]
    pub fn outbound(mut self, outbound: Outbound) -> Self {
        self.outbound = Some(outbound);
        self
    }

    /// Sets the runtime sessions are spawned on.
    ///
    /// Defaults to the runtime `build` is called from.
    #[inline]
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the relay with validation.
    ///
    /// Initializes the codec; a codec failure is reported to the host as
    /// `"failed to load"` and does not fail the build.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no outbound channel is set
    /// - [`Error::Config`] if no runtime is set and none is current
    /// - [`Error::Config`] if the backend URL, limits or timeouts are invalid
    pub fn build(self) -> Result<Relay> {
        self.build_with_codec(Codec::init())
    }

    /// Builds the relay around an already initialized codec result.
    pub(crate) fn build_with_codec(self, codec: Result<Codec>) -> Result<Relay> {
        let endpoint = self.validate_endpoint()?;
        self.validate_limits()?;
        let outbound = self.validate_outbound()?;
        let runtime = self.validate_runtime()?;

        let settings = RelaySettings {
            pre_warm: self.options.pre_warm,
            max_capacity: self.options.max_capacity,
            max_workers: self.options.max_workers,
            outbound,
            runtime,
        };

        Ok(Relay::new(self.options.role, endpoint, codec, settings))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl RelayBuilder {
    /// Validates the backend URL and timeouts.
    fn validate_endpoint(&self) -> Result<Endpoint> {
        for (name, value) in [
            ("connect_timeout", self.options.connect_timeout_ms),
            ("reply_timeout", self.options.reply_timeout_ms),
        ] {
            if value == Some(0) {
                return Err(Error::config(format!(
                    "{name} must be positive. Use None for no limit."
                )));
            }
        }

        Ok(Endpoint::parse(self.options.backend())?
            .with_connect_timeout(self.options.connect_timeout())
            .with_reply_timeout(self.options.reply_timeout()))
    }

    /// Validates capacity and worker limits.
    fn validate_limits(&self) -> Result<()> {
        if self.options.max_capacity == 0 {
            return Err(Error::config("max_capacity must be positive"));
        }

        if self.options.max_workers == 0 {
            return Err(Error::config("max_workers must be positive"));
        }

        Ok(())
    }

    /// Validates the outbound channel.
    fn validate_outbound(&self) -> Result<Outbound> {
        self.outbound.clone().ok_or_else(|| {
            Error::config(
                "Outbound channel is required. Use .outbound() to set it.\n\
                 Example: Relay::builder().outbound(tx)",
            )
        })
    }

    /// Resolves the runtime handle.
    fn validate_runtime(&self) -> Result<Handle> {
        if let Some(runtime) = &self.runtime {
            return Ok(runtime.clone());
        }

        Handle::try_current().map_err(|_| {
            Error::config(
                "No tokio runtime. Call build() inside a runtime or use .runtime() to set one.",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
