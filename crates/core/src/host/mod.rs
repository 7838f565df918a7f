//! Interfaces the hosting runtime provides to the clock component.
//!
//! The component never looks its environment up implicitly. A host hands it a
//! [`SchedulingContext`] to run the tick loop on, a [`RedrawHook`] to call
//! when the display is stale, and optionally a [`WallClock`] to read time from.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use jiff::Timestamp;
use tokio::{runtime::Handle, task::AbortHandle};

use crate::{ClockError, Result};

/// Boxed task launched on a scheduling context.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Callback used to request a redraw from the host.
pub type RedrawHook = Arc<dyn Fn() + Send + Sync>;

/// Redraw hook that ignores every request.
pub fn no_redraw() -> RedrawHook {
    Arc::new(|| {})
}

/// A cooperative execution context owned by the host.
///
/// Tasks launched here live no longer than the context itself: once the host
/// shuts the context down every task it launched is cancelled.
pub trait SchedulingContext: Send + Sync {
    /// Starts `task` and returns a handle that can cancel it.
    fn launch(&self, task: TaskFuture) -> Result<TaskHandle>;

    /// Whether the context still accepts tasks.
    fn is_active(&self) -> bool;
}

/// Cancellation handle for a launched task.
#[derive(Debug)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn new(abort: AbortHandle) -> Self {
        Self { abort }
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Tokio-backed [`SchedulingContext`] whose lifetime is controlled by the host.
///
/// Clones share the same scope. Closing the scope, or dropping its last
/// clone, aborts every task launched through it.
#[derive(Clone)]
pub struct HostScope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    handle: Handle,
    tasks: Mutex<Vec<AbortHandle>>,
    closed: AtomicBool,
}

impl HostScope {
    pub fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                handle,
                tasks: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a scope on the runtime the caller is currently running in.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ClockError::MissingSchedulingContext)
    }

    /// Shuts the scope down and cancels all tasks launched through it.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("closing host scope");
        }
        self.inner.abort_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of launched tasks that have not completed yet.
    pub fn live_tasks(&self) -> usize {
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }
}

impl ScopeInner {
    fn abort_all(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.abort_all();
    }
}

impl SchedulingContext for HostScope {
    fn launch(&self, task: TaskFuture) -> Result<TaskHandle> {
        if self.is_closed() {
            return Err(ClockError::SchedulingContextClosed);
        }

        let abort = self.inner.handle.spawn(task).abort_handle();
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(abort.clone());
        Ok(TaskHandle::new(abort))
    }

    fn is_active(&self) -> bool {
        !self.is_closed()
    }
}

impl fmt::Debug for HostScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostScope")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Source of the current wall-clock instant.
pub trait WallClock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Reads the operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
