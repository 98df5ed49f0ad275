//! Datagram delivery to the supervisor.

use std::os::unix::net::UnixDatagram;
use std::time::Duration;

use crate::config::NotifyConfig;
use crate::notify::clock::monotonic_usec;
use crate::notify::{ChannelAddress, NotificationMessage, NotifyError, NOTIFY_SOCKET_ENV};
use crate::observability::metrics;

/// Upper bound on a single send so a wedged supervisor cannot stall the caller.
const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Sends lifecycle notifications to the address named by an environment variable.
///
/// The variable is re-read on every call and no socket outlives a call.
#[derive(Debug, Clone)]
pub struct Notifier {
    socket_env: String,
}

impl Notifier {
    /// Notifier reading `NOTIFY_SOCKET`.
    pub fn new() -> Self {
        Self::with_socket_env(NOTIFY_SOCKET_ENV)
    }

    /// Notifier reading the address from a different variable.
    pub fn with_socket_env(var: impl Into<String>) -> Self {
        Self {
            socket_env: var.into(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::with_socket_env(config.socket_env.clone())
    }

    /// Name of the variable holding the supervisor address.
    pub fn socket_env(&self) -> &str {
        &self.socket_env
    }

    /// Send `message` as one datagram.
    pub fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let result = self.deliver(message.as_bytes());

        match &result {
            Ok(true) => {
                metrics::record_notification(message.kind(), true);
                tracing::debug!(message = %message, "Notification sent");
            }
            Ok(false) => {
                tracing::trace!(message = %message, env = %self.socket_env, "No supervisor, notification skipped");
            }
            Err(e) => {
                metrics::record_notification(message.kind(), false);
                tracing::debug!(message = %message, error = %e, "Notification failed");
            }
        }

        result.map(|_| ())
    }

    /// Send a raw payload. Empty payloads fail with `InvalidArgument` before anything else.
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<(), NotifyError> {
        let message = NotificationMessage::new(bytes)?;
        self.send(&message)
    }

    /// Returns whether a datagram was actually sent.
    fn deliver(&self, payload: &[u8]) -> Result<bool, NotifyError> {
        let Some(address) = ChannelAddress::from_env(&self.socket_env)? else {
            return Ok(false);
        };

        // Dropped on every return path below, which closes the descriptor.
        let socket = UnixDatagram::unbound().map_err(NotifyError::Transport)?;
        socket
            .set_write_timeout(Some(SEND_TIMEOUT))
            .map_err(NotifyError::Transport)?;
        address.connect(&socket).map_err(NotifyError::Transport)?;

        let written = socket.send(payload).map_err(NotifyError::Transport)?;
        if written != payload.len() {
            return Err(NotifyError::Transport(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short datagram: sent {written} of {} bytes", payload.len()),
            )));
        }

        Ok(true)
    }

    /// `READY=1`
    pub fn ready(&self) -> Result<(), NotifyError> {
        self.send(&NotificationMessage::ready())
    }

    /// `STOPPING=1`
    pub fn stopping(&self) -> Result<(), NotifyError> {
        self.send(&NotificationMessage::stopping())
    }

    /// `RELOADING=1` with the current monotonic time, read on every call.
    pub fn reloading(&self) -> Result<(), NotifyError> {
        let usec = monotonic_usec().map_err(NotifyError::Clock)?;
        self.send(&NotificationMessage::reloading(usec))
    }

    /// `DEBUG=1`
    pub fn debug_enabled(&self) -> Result<(), NotifyError> {
        self.send(&NotificationMessage::debug_enabled())
    }

    /// `STATUS=<text>`
    pub fn status(&self, text: &str) -> Result<(), NotifyError> {
        let message = NotificationMessage::builder().field("STATUS", text)?.build()?;
        self.send(&message)
    }

    /// `MAINPID=<pid>`
    pub fn main_pid(&self, pid: u32) -> Result<(), NotifyError> {
        let message = NotificationMessage::builder().field("MAINPID", pid)?.build()?;
        self.send(&message)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
