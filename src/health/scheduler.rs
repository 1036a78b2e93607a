//! Periodic health checking.
//!
//! # Responsibilities
//! - Run one health cycle per interval, never two at once
//! - Probe every backend sequentially and write the verdict to its liveness flag
//! - Stop at the next backend boundary once shutdown is signalled
//!
//! # States
//! ```text
//! Idle → Running → Idle → … → Stopped
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::{probe_until_cancelled, HealthProbe};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::BackendPool;
use crate::observability::{EventSink, LivenessSource, ProxyEvent};

/// Scheduler state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

impl From<u8> for SchedulerState {
    fn from(val: u8) -> Self {
        match val {
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopped,
            _ => SchedulerState::Idle,
        }
    }
}

/// Result of a single health cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// Shutdown fired; `checked` backends had been updated.
    Aborted { checked: usize },
}

pub struct HealthScheduler {
    pool: Arc<BackendPool>,
    probe: Arc<dyn HealthProbe>,
    interval: Duration,
    timeout: Duration,
    sink: Arc<dyn EventSink>,
    state: AtomicU8,
}

impl HealthScheduler {
    pub fn new(
        pool: Arc<BackendPool>,
        probe: Arc<dyn HealthProbe>,
        interval: Duration,
        timeout: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            pool,
            probe,
            interval,
            timeout,
            sink,
            state: AtomicU8::new(SchedulerState::Idle as u8),
        }
    }

    pub fn from_config(
        pool: Arc<BackendPool>,
        probe: Arc<dyn HealthProbe>,
        config: &HealthCheckConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::new(
            pool,
            probe,
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.timeout_secs),
            sink,
        )
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Run cycles until shutdown. The first cycle starts one interval in.
    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            backends = self.pool.len(),
            "Health scheduler starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let tick = tokio::select! {
                biased;
                _ = shutdown.recv() => false,
                _ = ticker.tick() => true,
            };
            if !tick {
                break;
            }

            tracing::debug!("Starting health check");
            if let CycleOutcome::Aborted { .. } = self.run_cycle(&mut shutdown).await {
                break;
            }
        }

        self.set_state(SchedulerState::Stopped);
        tracing::info!("Closing health check");
    }

    /// Probe every backend once, in pool order.
    pub async fn run_cycle(&self, shutdown: &mut ShutdownSignal) -> CycleOutcome {
        self.set_state(SchedulerState::Running);

        let backends = self.pool.backends();
        let total = backends.len();

        for (checked, backend) in backends.iter().enumerate() {
            let verdict = probe_until_cancelled(
                self.probe.as_ref(),
                backend.url(),
                self.timeout,
                shutdown,
            )
            .await;

            let Some(alive) = verdict else {
                self.sink.emit(ProxyEvent::HealthCycleAborted { checked, total });
                self.set_state(SchedulerState::Idle);
                return CycleOutcome::Aborted { checked };
            };

            let was_alive = backend.set_alive(alive);
            if was_alive != alive {
                self.sink.emit(ProxyEvent::LivenessChanged {
                    backend: backend.to_string(),
                    was_alive,
                    alive,
                    source: LivenessSource::HealthCheck,
                });
            }
            tracing::debug!(
                backend = %backend,
                status = if alive { "up" } else { "down" },
                "URL Status"
            );
        }

        self.set_state(SchedulerState::Idle);
        CycleOutcome::Completed
    }
}
