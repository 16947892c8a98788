use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PollingConfig;
use crate::events::{AppEvent, EventBroadcaster};
use crate::monitor::StatusMonitor;
use crate::{Error, Result};

/// The one armed timer.
struct TimerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    interval: Duration,
}

struct SchedulerState {
    polling: PollingConfig,
    has_entities: bool,
    stopped: bool,
    timer: Option<TimerHandle>,
}

impl SchedulerState {
    fn should_run(&self) -> bool {
        !self.stopped && self.polling.enabled && self.has_entities
    }
}

/// Drives periodic evaluation through a [`StatusMonitor`].
///
/// State machine: `Idle` (no timer) and `Running` (exactly one timer).
/// Entering `Running` waits a settle delay, runs a bootstrap tick, then ticks
/// every `interval_secs`. Leaving `Running` cancels the timer and any
/// in-flight tick's commit.
pub struct PollingScheduler {
    monitor: Arc<StatusMonitor>,
    settle_delay: Duration,
    runtime: Handle,
    events: EventBroadcaster,
    state: Mutex<SchedulerState>,
}

impl PollingScheduler {
    /// Create an idle scheduler. Must be called from within a tokio runtime.
    pub fn new(
        monitor: Arc<StatusMonitor>,
        polling: PollingConfig,
        settle_delay: Duration,
        events: EventBroadcaster,
    ) -> Result<Self> {
        polling.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("scheduler needs a tokio runtime: {}", e)))?;

        Ok(Self {
            monitor,
            settle_delay,
            runtime,
            events,
            state: Mutex::new(SchedulerState {
                polling,
                has_entities: false,
                stopped: true,
                timer: None,
            }),
        })
    }

    /// Allow the scheduler to run; it starts if polling is enabled and
    /// entities exist.
    pub fn start(&self) {
        let mut state = self.state.lock();
        state.stopped = false;
        self.reconcile(&mut state, false);
    }

    /// Stop polling. No tick commits or notifies after this returns.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        self.reconcile(&mut state, false);
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.polling.enabled = enabled;
        self.reconcile(&mut state, false);
    }

    /// Change the interval. A running timer is replaced immediately, so the
    /// next tick comes at most one new interval from now.
    pub fn set_interval(&self, interval_secs: u64) -> Result<()> {
        let polling = PollingConfig {
            interval_secs,
            ..self.state.lock().polling
        };
        polling.validate()?;

        let mut state = self.state.lock();
        state.polling.interval_secs = interval_secs;
        self.reconcile(&mut state, true);
        Ok(())
    }

    /// Tell the scheduler whether any entity is tracked.
    pub fn set_has_entities(&self, has_entities: bool) {
        self.update_has_entities(|| has_entities);
    }

    /// Re-read whether any entity is tracked while holding the state lock,
    /// so concurrent adds and removes settle on the latest answer.
    pub fn update_has_entities(&self, has_entities: impl FnOnce() -> bool) {
        let mut state = self.state.lock();
        let has_entities = has_entities();
        if state.has_entities != has_entities {
            state.has_entities = has_entities;
            self.reconcile(&mut state, false);
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().timer.is_some()
    }

    pub fn polling(&self) -> PollingConfig {
        self.state.lock().polling
    }

    /// Bring the timer in line with the state: cancel-then-replace.
    fn reconcile(&self, state: &mut SchedulerState, interval_changed: bool) {
        let was_running = state.timer.is_some();
        let interval = state.polling.interval();
        let want = state.should_run();

        if let Some(timer) = &state.timer
            && want
            && timer.interval == interval
        {
            return;
        }

        if let Some(timer) = state.timer.take() {
            self.teardown(timer);
        }

        if want {
            // A fresh start settles and bootstraps; an interval change only
            // re-arms so the new interval takes effect at once.
            let first_delay = if was_running && interval_changed {
                interval
            } else {
                self.settle_delay
            };
            debug_assert!(state.timer.is_none(), "scheduler armed a second timer");
            state.timer = Some(self.arm(first_delay, interval));
        }

        let running = state.timer.is_some();
        if running != was_running {
            info!(
                interval_secs = state.polling.interval_secs,
                "polling {}",
                if running { "started" } else { "stopped" }
            );
            self.events
                .publish(AppEvent::SchedulerStateChanged { running });
        } else if running {
            info!(interval_secs = state.polling.interval_secs, "polling re-armed");
        }
    }

    fn arm(&self, first_delay: Duration, interval: Duration) -> TimerHandle {
        let cancel = CancellationToken::new();
        // The deadline is fixed here, not when the task is first polled.
        let start = Instant::now() + first_delay;
        let task = self.runtime.spawn(run_timer(
            self.monitor.clone(),
            cancel.clone(),
            start,
            interval,
        ));
        TimerHandle {
            cancel,
            task,
            interval,
        }
    }

    fn teardown(&self, timer: TimerHandle) {
        timer.cancel.cancel();
        timer.task.abort();
        // Wait out a commit that was already past its cancellation check.
        self.monitor.fence();
        debug!("polling timer torn down");
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.cancel.cancel();
            timer.task.abort();
        }
    }
}

impl std::fmt::Debug for PollingScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PollingScheduler")
            .field("polling", &state.polling)
            .field("has_entities", &state.has_entities)
            .field("running", &state.timer.is_some())
            .finish()
    }
}

async fn run_timer(
    monitor: Arc<StatusMonitor>,
    cancel: CancellationToken,
    start: Instant,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval_at(start, interval);
    // A tick that overruns the interval swallows the fires it missed.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            report = monitor.run_tick(&cancel) => {
                if report.is_none() {
                    debug!("tick produced no commit");
                }
            }
        }
    }

    debug!("polling timer exited");
}
