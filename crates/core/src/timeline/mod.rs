use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use jiff::Timestamp;

use crate::{
    host::{SchedulingContext, TaskHandle, WallClock},
    Result,
};

/// Nominal spacing between ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Time left until the next whole multiple of `interval` on the wall clock.
///
/// Exactly on a boundary this is a full interval, never zero.
pub fn delay_to_next_interval(now: Timestamp, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis().max(1) as i64;
    let elapsed_ms = now.as_millisecond().rem_euclid(interval_ms);
    Duration::from_millis((interval_ms - elapsed_ms) as u64)
}

/// Periodic callback phase-aligned to whole-second boundaries.
///
/// Every wait is recomputed from the current wall clock instead of being
/// accumulated from a fixed origin, so processing jitter and clock adjustments
/// never add up across ticks.
pub struct TickScheduler {
    clock: Arc<dyn WallClock>,
    interval: Duration,
    running: Option<RunningTicks>,
}

struct RunningTicks {
    task: TaskHandle,
    cancelled: Arc<AtomicBool>,
}

impl TickScheduler {
    pub fn new(clock: Arc<dyn WallClock>) -> Self {
        Self::with_interval(clock, TICK_INTERVAL)
    }

    pub fn with_interval(clock: Arc<dyn WallClock>, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Launches the tick loop on `context`, replacing any loop already running.
    pub fn start<F>(&mut self, context: &dyn SchedulingContext, mut on_tick: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        let cancelled = Arc::new(AtomicBool::new(false));
        let gate = cancelled.clone();
        let clock = self.clock.clone();
        let interval = self.interval;

        let task = context.launch(Box::pin(async move {
            loop {
                let delay = delay_to_next_interval(clock.now(), interval);
                tokio::time::sleep(delay).await;
                if gate.load(Ordering::SeqCst) {
                    break;
                }
                tracing::trace!(?delay, "tick");
                on_tick();
            }
        }))?;

        self.running = Some(RunningTicks { task, cancelled });
        Ok(())
    }

    /// Cancels pending and future ticks. Safe to call at any time.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancelled.store(true, Ordering::SeqCst);
            running.task.cancel();
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}
