//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGHUP          → request reload
//!     SIGINT/SIGTERM  → request termination
//!     SIGUSR1         → request reload that ends in a simulated crash
//!     SIGUSR2         → DEBUG=1 + debugger activation (debug.rs), right away
//!
//! State (state.rs):
//!     requests recorded atomically in the shared Lifecycle context
//!
//! Main loop (service.rs):
//!     READY=1 → [drain requests → work (workload.rs) → sleep]* → STOPPING=1
//! ```
//!
//! # Design Decisions
//! - Signal listeners only record requests; the loop is the sole consumer
//! - Termination is cooperative and observed at the next iteration boundary
//! - Fake death is a named outcome, not an early return buried in a handler

pub mod debug;
pub mod service;
pub mod signals;
pub mod state;
pub mod workload;

pub use debug::{DebugError, DebugListener, RemoteDebugger};
pub use service::{Outcome, Service, ServiceError, FAKE_DEATH_MESSAGE};
pub use signals::{Action, LifecycleSignal, SignalRouter};
pub use state::{Lifecycle, LifecycleSnapshot, Phase};
pub use workload::{Heartbeat, Workload, WorkloadError};
