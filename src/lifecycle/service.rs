//! Main loop.
//!
//! # State Machine
//! ```text
//! Initializing → Running ⇄ Reloading → Terminating
//!                Running ─────────────→ Terminating
//!                          Reloading ─→ FakedDeath (SIGUSR1)
//! ```
//!
//! # Responsibilities
//! - Announce readiness once setup is done
//! - Drain pending reload and remote debug requests once per iteration
//! - Run one unit of work, then sleep for the configured interval
//! - Announce stopping once termination is observed
//!
//! # Design Decisions
//! - Notification failures are logged, never fatal
//! - The sleep is the only suspension point; requests that arrive during it are
//!   handled on the next iteration
//! - Fake death is returned as an outcome so the binary owns the process exit

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{load_config, ServiceConfig, StartupOverrides};
use crate::lifecycle::debug::{engage, DebugListener, RemoteDebugger};
use crate::lifecycle::signals::SignalRouter;
use crate::lifecycle::state::Lifecycle;
use crate::lifecycle::workload::{Workload, WorkloadError};
use crate::notify::{ChannelAddress, Notifier, NotifyError};
use crate::observability::metrics;

/// Message printed when the service exits through the fake-death path.
pub const FAKE_DEATH_MESSAGE: &str = "SIGUSR1 received, faking death";

/// How the main loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Graceful shutdown after `STOPPING=1`.
    Stopped,
    /// Simulated crash during reload. Neither `READY=1` nor `STOPPING=1` follows.
    FakedDeath,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Stopped => 0,
            Outcome::FakedDeath => 1,
        }
    }
}

/// Error type for service startup.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid supervisor address: {0}")]
    Notify(#[from] NotifyError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("setup failed: {0}")]
    Setup(#[source] WorkloadError),
}

/// A supervised service: lifecycle context, notifier, debugger and workload.
pub struct Service<W> {
    config: ServiceConfig,
    config_path: Option<PathBuf>,
    overrides: StartupOverrides,
    interval: Duration,
    interval_pinned: bool,
    lifecycle: Arc<Lifecycle>,
    notifier: Notifier,
    debugger: Arc<dyn RemoteDebugger>,
    workload: W,
}

impl<W: Workload> Service<W> {
    pub fn new(config: ServiceConfig, workload: W) -> Self {
        let lifecycle = Arc::new(Lifecycle::new(config.debug.enabled));
        let debugger = Arc::new(DebugListener::new(
            config.debug.listen_address.clone(),
            lifecycle.clone(),
        ));

        Self {
            interval: Duration::from_secs(config.service.interval_secs),
            notifier: Notifier::from_config(&config.notify),
            config_path: None,
            overrides: StartupOverrides::default(),
            interval_pinned: false,
            lifecycle,
            debugger,
            workload,
            config,
        }
    }

    /// File to re-read on every reload.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Startup overrides, applied now and again on top of every reloaded file.
    pub fn with_overrides(mut self, overrides: StartupOverrides) -> Self {
        overrides.apply(&mut self.config);
        if !self.interval_pinned {
            self.interval = Duration::from_secs(self.config.service.interval_secs);
        }
        self.overrides = overrides;
        self
    }

    pub fn with_debugger(mut self, debugger: Arc<dyn RemoteDebugger>) -> Self {
        self.debugger = debugger;
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Override the sleep between iterations. Reloads keep this interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self.interval_pinned = true;
        self
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        self.lifecycle.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Router bound to this service's lifecycle, notifier and debugger.
    pub fn router(&self) -> SignalRouter {
        SignalRouter::new(self.lifecycle.clone(), self.notifier.clone(), self.debugger.clone())
    }

    /// Install signal handlers, then drive the loop to completion.
    pub async fn run(self) -> Result<Outcome, ServiceError> {
        let router = Arc::new(self.router());
        let handles = router.install().map_err(ServiceError::Signals)?;

        let result = self.drive().await;

        for handle in handles {
            handle.abort();
        }
        result
    }

    /// Drive the state machine without touching process signal dispositions.
    pub async fn drive(mut self) -> Result<Outcome, ServiceError> {
        // A malformed address is a deployment error and should stop startup.
        ChannelAddress::from_env(self.notifier.socket_env())?;

        tracing::info!(pid = std::process::id(), "Doing initial setup");
        self.workload.setup().map_err(ServiceError::Setup)?;
        tracing::info!("Done setting up");

        report("READY", self.notifier.ready());
        self.lifecycle.mark_running();

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Starting loop");
        while !self.lifecycle.is_terminating() {
            if self.lifecycle.take_reload() && self.reload() == Some(Outcome::FakedDeath) {
                return Ok(Outcome::FakedDeath);
            }

            if self.lifecycle.take_remote_debug() {
                engage(&self.notifier, self.debugger.as_ref(), &self.lifecycle);
            }

            self.workload.work(&self.lifecycle);
            tracing::debug!(interval_ms = self.interval.as_millis() as u64, "Sleeping");
            tokio::time::sleep(self.interval).await;
        }

        tracing::info!("Terminating");
        report("STOPPING", self.notifier.stopping());
        Ok(Outcome::Stopped)
    }

    /// One reload cycle. Returns the terminal outcome if the reload ends the process.
    fn reload(&mut self) -> Option<Outcome> {
        tracing::info!("Reloading");
        metrics::record_reload();
        report("RELOADING", self.notifier.reloading());

        self.reconfigure();

        if self.lifecycle.is_faking_death() {
            tracing::error!("{FAKE_DEATH_MESSAGE}");
            return Some(Outcome::FakedDeath);
        }

        self.lifecycle.finish_reload();
        tracing::info!("Done reloading");
        report("READY", self.notifier.ready());
        None
    }

    fn reconfigure(&mut self) {
        if let Some(path) = &self.config_path {
            match load_config(path) {
                Ok(mut config) => {
                    self.overrides.apply(&mut config);
                    let interval = Duration::from_secs(config.service.interval_secs);
                    if !self.interval_pinned && interval != self.interval {
                        tracing::info!(
                            old_secs = self.interval.as_secs(),
                            new_secs = interval.as_secs(),
                            "Loop interval changed"
                        );
                        self.interval = interval;
                    }
                    if config.notify != self.config.notify {
                        tracing::warn!("notify settings changed; restart to apply");
                    }
                    self.config = config;
                }
                Err(e) => {
                    tracing::error!(path = ?path, "Failed to reload config: {}. Keeping current configuration.", e);
                }
            }
        }

        if let Err(e) = self.workload.reconfigure() {
            tracing::error!(error = %e, "Workload reconfiguration failed");
        }
    }
}

fn report(kind: &'static str, result: Result<(), NotifyError>) {
    if let Err(e) = result {
        tracing::warn!(kind, error = %e, "Supervisor notification failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::workload::Heartbeat;

    fn quiet_config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.notify.socket_env = "LIFECYCLE_NOTIFIER_TEST_NEVER_SET".into();
        config
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Stopped.exit_code(), 0);
        assert_ne!(Outcome::FakedDeath.exit_code(), 0);
    }

    #[test]
    fn test_new_uses_config() {
        let mut config = quiet_config();
        config.service.interval_secs = 7;
        config.debug.enabled = true;

        let service = Service::new(config, Heartbeat::default());
        assert_eq!(service.interval(), Duration::from_secs(7));
        assert!(service.lifecycle().debug_enabled());
    }

    #[tokio::test]
    async fn test_terminate_before_start_stops_after_setup() {
        let service = Service::new(quiet_config(), Heartbeat::default()).with_interval(Duration::from_millis(5));
        service.lifecycle().request_terminate();

        assert_eq!(service.drive().await.unwrap(), Outcome::Stopped);
    }

    #[tokio::test]
    async fn test_bad_address_fails_startup() {
        let var = "LIFECYCLE_NOTIFIER_TEST_BAD_FAMILY";
        crate::test_env::set(var, "localhost:9000");
        let mut config = quiet_config();
        config.notify.socket_env = var.into();

        let err = Service::new(config, Heartbeat::default()).drive().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Notify(NotifyError::UnsupportedAddressFamily(_))
        ));
    }

    fn config_file(body: &str) -> tempfile::NamedTempFile {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn test_reload_keeps_startup_overrides() {
        let file = config_file("[service]\ninterval_secs = 3\n[debug]\nenabled = false");
        let overrides = StartupOverrides {
            interval_secs: Some(1),
            debug: Some(true),
            log_level: Some("debug".into()),
        };
        let mut service = Service::new(quiet_config(), Heartbeat::default())
            .with_overrides(overrides)
            .with_config_path(file.path());
        assert_eq!(service.interval(), Duration::from_secs(1));

        service.reconfigure();

        assert_eq!(service.interval(), Duration::from_secs(1));
        assert_eq!(service.config().service.interval_secs, 1);
        assert!(service.config().debug.enabled);
        assert_eq!(service.config().observability.log_level, "debug");
    }

    #[test]
    fn test_reload_applies_file_interval_without_overrides() {
        let file = config_file("[service]\ninterval_secs = 3");
        let mut service = Service::new(quiet_config(), Heartbeat::default()).with_config_path(file.path());

        service.reconfigure();
        assert_eq!(service.interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_reload_keeps_pinned_interval() {
        let file = config_file("[service]\ninterval_secs = 3");
        let mut service = Service::new(quiet_config(), Heartbeat::default())
            .with_interval(Duration::from_millis(20))
            .with_overrides(StartupOverrides {
                interval_secs: Some(9),
                ..StartupOverrides::default()
            })
            .with_config_path(file.path());

        service.reconfigure();
        assert_eq!(service.interval(), Duration::from_millis(20));
        assert_eq!(service.config().service.interval_secs, 9);
    }

    struct FailingSetup;

    impl Workload for FailingSetup {
        fn setup(&mut self) -> Result<(), WorkloadError> {
            Err("no database".into())
        }

        fn work(&mut self, _lifecycle: &Lifecycle) {}
    }

    #[tokio::test]
    async fn test_setup_failure_aborts_startup() {
        let err = Service::new(quiet_config(), FailingSetup).drive().await.unwrap_err();
        assert!(matches!(err, ServiceError::Setup(_)));
    }
}
