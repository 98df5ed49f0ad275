//! The service's own work, driven by the main loop.

use crate::lifecycle::state::Lifecycle;

/// Error returned by workload hooks.
pub type WorkloadError = Box<dyn std::error::Error + Send + Sync>;

/// Hooks the main loop calls at each lifecycle step.
pub trait Workload: Send {
    /// Runs once before readiness is announced. Failing here aborts startup.
    fn setup(&mut self) -> Result<(), WorkloadError> {
        Ok(())
    }

    /// Runs on every honored reload. Failures are logged and the loop carries on.
    fn reconfigure(&mut self) -> Result<(), WorkloadError> {
        Ok(())
    }

    /// One unit of work per loop iteration.
    fn work(&mut self, lifecycle: &Lifecycle);
}

/// Placeholder workload that only reports liveness.
#[derive(Debug, Default)]
pub struct Heartbeat {
    iterations: u64,
}

impl Heartbeat {
    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}

impl Workload for Heartbeat {
    fn work(&mut self, lifecycle: &Lifecycle) {
        self.iterations += 1;
        tracing::info!(
            debug = lifecycle.debug_enabled(),
            pid = std::process::id(),
            iteration = self.iterations,
            "Working"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_counts_iterations() {
        let lifecycle = Lifecycle::new(false);
        let mut heartbeat = Heartbeat::default();

        assert!(heartbeat.setup().is_ok());
        heartbeat.work(&lifecycle);
        heartbeat.work(&lifecycle);
        assert!(heartbeat.reconfigure().is_ok());

        assert_eq!(heartbeat.iterations(), 2);
    }
}
