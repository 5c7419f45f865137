//! Relay dispatcher module.
//!
//! This module provides the main entry point for hosts.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Relay`] | Turns inbound host messages into sessions |
//! | [`RelayBuilder`] | Fluent configuration builder |
//! | [`RelayOptions`] | Deserializable settings |
//! | [`Role`] | Sender or receiver |
//!
//! # Example
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use wsrelay::{HostMessage, Relay, Result, Role};
//!
//! # async fn example() -> Result<()> {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//!
//! let relay = Relay::builder()
//!     .role(Role::Sender)
//!     .outbound(tx)
//!     .build()?;
//!
//! relay.handle_message(HostMessage::from("hello"));
//!
//! while let Some(line) = rx.recv().await {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for relay configuration.
pub mod builder;

/// Core relay implementation.
pub mod core;

/// Relay settings and roles.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::RelayBuilder;
pub use core::Relay;
pub use options::{RelayOptions, Role};
