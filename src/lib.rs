//! Supervisor lifecycle notifications driven by process signals.

pub mod config;
pub mod lifecycle;
pub mod notify;
pub mod observability;

pub use config::ServiceConfig;
pub use lifecycle::{Lifecycle, Outcome, Service};
pub use notify::{NotificationMessage, Notifier, NotifyError};
