//! Supervisor notification subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle event (ready, reloading, stopping, debug)
//!     → message.rs (KEY=VALUE fields, newline separated)
//!     → address.rs (resolve NOTIFY_SOCKET: /path or @abstract)
//!     → notifier.rs (one datagram per call, socket dropped afterwards)
//!     → supervisor
//! ```
//!
//! # Design Decisions
//! - No supervisor (variable unset) is a successful no-op, not an error
//! - Nothing is retried; callers decide whether a failure matters
//! - The socket is never kept open between calls

pub mod address;
pub mod clock;
pub mod message;
pub mod notifier;

use std::io;

pub use address::ChannelAddress;
pub use message::{MessageBuilder, NotificationMessage};
pub use notifier::Notifier;

/// Name of the environment variable carrying the supervisor's socket address.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Errors produced while encoding or delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The message was empty or otherwise malformed by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A `KEY=VALUE` field could not be encoded.
    #[error("invalid field {key:?}: {reason}")]
    InvalidField { key: String, reason: &'static str },

    /// The socket address is neither a filesystem path nor an abstract name.
    #[error("unsupported socket address family: {0:?}")]
    UnsupportedAddressFamily(String),

    /// Connecting to or sending on the supervisor socket failed.
    #[error("notification transport error: {0}")]
    Transport(#[source] io::Error),

    /// The monotonic clock could not be read.
    #[error("failed to read monotonic clock: {0}")]
    Clock(#[source] io::Error),
}
