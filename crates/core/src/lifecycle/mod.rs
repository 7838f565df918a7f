use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use jiff::tz::TimeZone;

use crate::{
    clock::ClockState,
    host::{RedrawHook, SchedulingContext, WallClock},
    timeline::TickScheduler,
    ClockError, Result,
};

/// Whether the clock currently has a live tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Detached,
    Running,
}

/// Ties a clock state and its tick loop to the host's attach/detach events.
///
/// Both are created together on attach and dropped together on detach or on
/// a zone change.
pub struct LifecycleBinding {
    wall_clock: Arc<dyn WallClock>,
    redraw: RedrawHook,
    running: Option<Running>,
}

struct Running {
    state: Arc<Mutex<ClockState>>,
    scheduler: TickScheduler,
}

impl LifecycleBinding {
    pub fn new(wall_clock: Arc<dyn WallClock>, redraw: RedrawHook) -> Self {
        Self {
            wall_clock,
            redraw,
            running: None,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        if self.running.is_some() {
            LifecyclePhase::Running
        } else {
            LifecyclePhase::Detached
        }
    }

    /// Latest snapshot, available only while running.
    pub fn clock_state(&self) -> Option<ClockState> {
        self.running
            .as_ref()
            .map(|running| *running.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_redraw_hook(&mut self, redraw: RedrawHook) {
        self.redraw = redraw;
    }

    pub fn set_wall_clock(&mut self, wall_clock: Arc<dyn WallClock>) {
        self.wall_clock = wall_clock;
    }

    /// Host attach: starts a fresh clock on `context`.
    ///
    /// A missing or shut-down context is a configuration error.
    pub fn attach(
        &mut self,
        context: Option<&dyn SchedulingContext>,
        zone: &TimeZone,
    ) -> Result<()> {
        let context = context.ok_or(ClockError::MissingSchedulingContext)?;
        if !context.is_active() {
            return Err(ClockError::SchedulingContextClosed);
        }
        self.start(context, zone)
    }

    /// Host detach: stops ticking and forgets the clock state.
    pub fn detach(&mut self) {
        if let Some(mut running) = self.running.take() {
            running.scheduler.stop();
            tracing::debug!("clock detached");
        }
    }

    /// Zone change: restarts the clock when running, otherwise does nothing.
    ///
    /// A context that shut down underneath a running clock leaves it detached.
    pub fn zone_changed(
        &mut self,
        context: Option<&dyn SchedulingContext>,
        zone: &TimeZone,
    ) -> Result<()> {
        if self.running.is_none() {
            return Ok(());
        }
        if context.is_some_and(|context| !context.is_active()) {
            tracing::debug!("scheduling context closed, not restarting clock");
            self.detach();
            return Ok(());
        }
        self.attach(context, zone)
    }

    fn start(&mut self, context: &dyn SchedulingContext, zone: &TimeZone) -> Result<()> {
        self.detach();

        let state = Arc::new(Mutex::new(ClockState::derive(self.wall_clock.now(), zone)));
        let mut scheduler = TickScheduler::new(self.wall_clock.clone());

        let tick_state = state.clone();
        let wall_clock = self.wall_clock.clone();
        let redraw = self.redraw.clone();
        let zone = zone.clone();
        scheduler.start(context, move || {
            let next = ClockState::derive(wall_clock.now(), &zone);
            *tick_state.lock().unwrap_or_else(PoisonError::into_inner) = next;
            redraw();
        })?;

        let initial = *state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(state = %initial, "clock running");
        self.running = Some(Running { state, scheduler });
        Ok(())
    }
}

impl fmt::Debug for LifecycleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBinding")
            .field("phase", &self.phase())
            .field("clock_state", &self.clock_state())
            .finish()
    }
}
