//! Remote debug activation.
//!
//! # Responsibilities
//! - Define the `RemoteDebugger` seam the signal router and main loop call
//! - Provide a default listener that reports lifecycle state to whoever connects
//!
//! # Design Decisions
//! - Activation is idempotent: a second SIGUSR2 does not bind a second listener
//!   while the first is still serving; once its task ends, the next one rebinds
//! - `engage` clears the pending request only when activation succeeds, so the
//!   main loop retries a failed activation exactly once per request

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::lifecycle::state::{Lifecycle, LifecycleSnapshot};
use crate::notify::Notifier;

/// Error type for debugger activation.
#[derive(Debug, thiserror::Error)]
pub enum DebugError {
    #[error("failed to bind debug listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("debug listener requires a running Tokio runtime")]
    NoRuntime,
}

/// Something that can be attached to the running process on request.
pub trait RemoteDebugger: Send + Sync {
    fn activate(&self) -> Result<(), DebugError>;
}

/// Report written to each connection on the debug listener.
#[derive(Debug, Serialize)]
struct DebugReport {
    pid: u32,
    #[serde(flatten)]
    state: LifecycleSnapshot,
}

/// Default debugger: a TCP listener that answers every connection with a JSON
/// snapshot of the lifecycle state.
pub struct DebugListener {
    address: String,
    lifecycle: Arc<Lifecycle>,
    bound: Arc<Mutex<Option<SocketAddr>>>,
}

/// Owned by the accept task. Clears the bound address however the task ends.
struct BoundGuard(Arc<Mutex<Option<SocketAddr>>>);

impl Drop for BoundGuard {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = None;
        tracing::info!("Debug listener stopped");
    }
}

impl DebugListener {
    pub fn new(address: impl Into<String>, lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            address: address.into(),
            lifecycle,
            bound: Arc::new(Mutex::new(None)),
        }
    }

    /// Address actually bound, once activated.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RemoteDebugger for DebugListener {
    fn activate(&self) -> Result<(), DebugError> {
        let mut bound = self.bound.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(addr) = *bound {
            tracing::debug!(address = %addr, "Debug listener already active");
            self.lifecycle.set_debug(true);
            return Ok(());
        }

        let handle = tokio::runtime::Handle::try_current().map_err(|_| DebugError::NoRuntime)?;
        let bind_err = |source| DebugError::Bind {
            address: self.address.clone(),
            source,
        };

        let std_listener = std::net::TcpListener::bind(&self.address).map_err(bind_err)?;
        std_listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = std_listener.local_addr().map_err(bind_err)?;

        let lifecycle = self.lifecycle.clone();
        let guard = BoundGuard(self.bound.clone());
        handle.spawn(async move {
            let _guard = guard;
            let listener = match tokio::net::TcpListener::from_std(std_listener) {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to register debug listener");
                    return;
                }
            };

            loop {
                match listener.accept().await {
                    Ok((mut socket, peer)) => {
                        let report = DebugReport {
                            pid: std::process::id(),
                            state: lifecycle.snapshot(),
                        };
                        tracing::info!(peer = %peer, "Debugger attached");
                        let mut body = serde_json::to_vec(&report).unwrap_or_default();
                        body.push(b'\n');
                        let _ = socket.write_all(&body).await;
                        let _ = socket.shutdown().await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Debug listener accept failed");
                        break;
                    }
                }
            }
        });

        *bound = Some(local_addr);
        self.lifecycle.set_debug(true);
        tracing::info!(address = %local_addr, "Waiting for debugger attach");
        Ok(())
    }
}

/// Announce `DEBUG=1` and activate the debugger.
///
/// Returns whether activation succeeded. The pending request is cleared on success.
pub fn engage(notifier: &Notifier, debugger: &dyn RemoteDebugger, lifecycle: &Lifecycle) -> bool {
    if let Err(e) = notifier.debug_enabled() {
        tracing::warn!(error = %e, "Failed to send DEBUG notification");
    }
    tracing::info!("Remote debugging enabled");

    match debugger.activate() {
        Ok(()) => {
            lifecycle.take_remote_debug();
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Remote debug activation failed");
            false
        }
    }
}
