//! OS signal handling.
//!
//! # Responsibilities
//! - Register listeners for SIGHUP, SIGINT, SIGUSR1, SIGUSR2 and SIGTERM
//! - Translate each signal into a lifecycle request
//! - Announce and activate remote debugging immediately on SIGUSR2
//!
//! # Design Decisions
//! - Uses Tokio's signal streams; the OS-level handler only wakes a listener task
//! - Listener tasks record requests with one atomic update and nothing else
//! - The main loop observes requests at its next iteration boundary

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::lifecycle::debug::{engage, RemoteDebugger};
use crate::lifecycle::state::Lifecycle;
use crate::notify::Notifier;
use crate::observability::metrics;

/// Signals the service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleSignal {
    Hangup,
    Interrupt,
    User1,
    User2,
    Terminate,
}

/// What a signal asks the lifecycle controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Reload,
    Terminate,
    FakeDeath,
    RemoteDebug,
}

/// Signal to action routing table.
pub const ROUTES: [(LifecycleSignal, Action); 5] = [
    (LifecycleSignal::Hangup, Action::Reload),
    (LifecycleSignal::Interrupt, Action::Terminate),
    (LifecycleSignal::User1, Action::FakeDeath),
    (LifecycleSignal::User2, Action::RemoteDebug),
    (LifecycleSignal::Terminate, Action::Terminate),
];

impl LifecycleSignal {
    pub fn kind(self) -> SignalKind {
        match self {
            LifecycleSignal::Hangup => SignalKind::hangup(),
            LifecycleSignal::Interrupt => SignalKind::interrupt(),
            LifecycleSignal::User1 => SignalKind::user_defined1(),
            LifecycleSignal::User2 => SignalKind::user_defined2(),
            LifecycleSignal::Terminate => SignalKind::terminate(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LifecycleSignal::Hangup => "SIGHUP",
            LifecycleSignal::Interrupt => "SIGINT",
            LifecycleSignal::User1 => "SIGUSR1",
            LifecycleSignal::User2 => "SIGUSR2",
            LifecycleSignal::Terminate => "SIGTERM",
        }
    }

    pub fn action(self) -> Action {
        ROUTES
            .iter()
            .find(|(signal, _)| *signal == self)
            .map(|(_, action)| *action)
            .unwrap_or(Action::Terminate)
    }
}

/// Routes OS signals to lifecycle requests.
pub struct SignalRouter {
    lifecycle: Arc<Lifecycle>,
    notifier: Notifier,
    debugger: Arc<dyn RemoteDebugger>,
    installed: AtomicBool,
}

impl SignalRouter {
    pub fn new(lifecycle: Arc<Lifecycle>, notifier: Notifier, debugger: Arc<dyn RemoteDebugger>) -> Self {
        Self {
            lifecycle,
            notifier,
            debugger,
            installed: AtomicBool::new(false),
        }
    }

    /// Apply the routing table entry for `signal`.
    pub fn dispatch(&self, signal: LifecycleSignal) -> Action {
        let action = signal.action();
        metrics::record_signal(signal.name());
        tracing::info!(signal = signal.name(), action = ?action, "Signal received");

        match action {
            Action::Reload => {
                if !self.lifecycle.request_reload() {
                    tracing::debug!(signal = signal.name(), "Reload ignored while terminating");
                }
            }
            Action::Terminate => self.lifecycle.request_terminate(),
            Action::FakeDeath => {
                self.lifecycle.request_fake_death();
            }
            Action::RemoteDebug => {
                // Must attach now rather than at the next loop iteration. Only a failed
                // attempt is left for the loop to retry.
                if !engage(&self.notifier, self.debugger.as_ref(), &self.lifecycle) {
                    self.lifecycle.request_remote_debug();
                }
            }
        }

        action
    }

    /// Register every signal in the routing table and spawn one listener task per signal.
    ///
    /// All registrations happen before any task is spawned, so a failure leaves nothing
    /// half-installed. Installing a router twice is an error.
    pub fn install(self: Arc<Self>) -> io::Result<Vec<JoinHandle<()>>> {
        if self.installed.swap(true, Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "signal routes already installed",
            ));
        }

        let mut streams = Vec::with_capacity(ROUTES.len());
        for (sig, _) in ROUTES {
            match signal(sig.kind()) {
                Ok(stream) => streams.push((sig, stream)),
                Err(e) => {
                    self.installed.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        let handles = streams
            .into_iter()
            .map(|(sig, mut stream)| {
                let router = self.clone();
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        router.dispatch(sig);
                    }
                })
            })
            .collect();

        tracing::info!(pid = std::process::id(), "Signal handlers installed");
        Ok(handles)
    }
}
