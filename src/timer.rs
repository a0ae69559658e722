//! Schedule-a-callback-after-delay capability.
//!
//! The reveal scheduler never sleeps itself; it asks a [`Timer`] to run a
//! callback later and keeps the returned handle so the callback can be
//! cancelled.  [`TokioTimer`] is the runtime implementation and
//! [`ManualTimer`] lets callers fire callbacks deterministically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::AbortHandle;

/// A callback scheduled on a [`Timer`].
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a callback after a delay.
pub trait Timer {
    /// Handle used to cancel a scheduled callback.
    type Handle: TimerHandle;

    /// Runs `callback` once `delay` has elapsed, unless cancelled first.
    fn after(&self, delay: Duration, callback: Callback) -> Self::Handle;
}

/// Cancels a pending callback.
pub trait TimerHandle {
    /// Prevents the callback from running.  Has no effect once it has run.
    fn cancel(self);
}

///////////////////////////////////////////// Tokio ////////////////////////////////////////////

/// Timer backed by tokio tasks.  Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl TokioTimer {
    /// Creates a new tokio-backed timer.
    pub fn new() -> Self {
        Self
    }
}

/// Cancellation handle for [`TokioTimer`].
#[derive(Debug)]
pub struct TokioTimerHandle {
    abort: AbortHandle,
}

impl Timer for TokioTimer {
    type Handle = TokioTimerHandle;

    fn after(&self, delay: Duration, callback: Callback) -> Self::Handle {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        TokioTimerHandle {
            abort: task.abort_handle(),
        }
    }
}

impl TimerHandle for TokioTimerHandle {
    fn cancel(self) {
        self.abort.abort();
    }
}

///////////////////////////////////////////// Manual ///////////////////////////////////////////

/// Timer whose callbacks run only when asked to.
///
/// Clones share the same queue, so a caller can hand one clone to the
/// scheduler and keep another to fire callbacks.
#[derive(Clone, Default)]
pub struct ManualTimer {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    pending: VecDeque<Scheduled>,
    delays: Vec<Duration>,
    cancelled: usize,
}

struct Scheduled {
    id: u64,
    callback: Callback,
}

/// Cancellation handle for [`ManualTimer`].
#[derive(Clone)]
pub struct ManualTimerHandle {
    id: u64,
    inner: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    /// Creates an empty manual timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the oldest pending callback.  Returns false if none was pending.
    pub fn fire_next(&self) -> bool {
        // Release the lock before running the callback; it may schedule again.
        let scheduled = self.state().pending.pop_front();
        match scheduled {
            Some(scheduled) => {
                (scheduled.callback)();
                true
            }
            None => false,
        }
    }

    /// Number of callbacks waiting to run.
    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    /// Every delay ever requested, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.state().delays.clone()
    }

    /// Number of callbacks cancelled before they ran.
    pub fn cancelled(&self) -> usize {
        self.state().cancelled
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        lock(&self.inner)
    }
}

impl Timer for ManualTimer {
    type Handle = ManualTimerHandle;

    fn after(&self, delay: Duration, callback: Callback) -> Self::Handle {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        state.delays.push(delay);
        state.pending.push_back(Scheduled { id, callback });
        ManualTimerHandle {
            id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(self) {
        let mut state = lock(&self.inner);
        let before = state.pending.len();
        state.pending.retain(|scheduled| scheduled.id != self.id);
        if state.pending.len() < before {
            state.cancelled += 1;
        }
    }
}

fn lock(inner: &Mutex<ManualState>) -> MutexGuard<'_, ManualState> {
    // A panicking callback never holds the lock, so poisoning carries no torn state.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
