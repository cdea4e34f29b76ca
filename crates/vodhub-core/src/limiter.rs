//! Bounded-parallelism task runner
//!
//! Caps how many submitted tasks may run at once. Tasks start strictly in
//! submission order; a finishing task hands its slot to the oldest waiter.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

#[derive(Debug)]
struct LimiterState {
    capacity: usize,
    running: usize,
    queue: VecDeque<oneshot::Sender<()>>,
}

/// Limits the number of concurrently running tasks
///
/// Cloning is cheap; clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    state: Arc<Mutex<LimiterState>>,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `capacity` concurrent tasks
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LimiterState {
                capacity: capacity.max(1),
                running: 0,
                queue: VecDeque::new(),
            })),
        }
    }

    /// Submit a task and get a future of its result
    ///
    /// The task's place in line is taken when `submit` is called, not when the
    /// returned future is first polled. The task itself starts once the future
    /// is polled and a slot is free. Dropping the future gives its slot (or
    /// its place in line) back.
    pub fn submit<F, Fut>(&self, task: F) -> impl Future<Output = Fut::Output> + use<F, Fut>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let pending = self.enqueue();
        async move {
            let _slot = pending.granted().await;
            task().await
        }
    }

    /// Maximum number of concurrently running tasks
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Number of tasks currently holding a slot
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Number of submitted tasks waiting for a slot
    pub fn queued(&self) -> usize {
        self.lock().queue.iter().filter(|tx| !tx.is_closed()).count()
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self) -> PendingSlot {
        let mut state = self.lock();
        let admission = if state.running < state.capacity {
            state.running += 1;
            Admission::Granted
        } else {
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(tx);
            Admission::Waiting(rx)
        };

        PendingSlot {
            admission,
            state: Arc::clone(&self.state),
        }
    }
}

/// Releases one slot: hands it to the oldest live waiter or frees it
fn release(state: &Mutex<LimiterState>) {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    while let Some(tx) = state.queue.pop_front() {
        if tx.send(()).is_ok() {
            return;
        }
    }
    state.running = state.running.saturating_sub(1);
}

enum Admission {
    /// A slot was free at submission
    Granted,
    /// Waiting for a running task to hand its slot over
    Waiting(oneshot::Receiver<()>),
    /// Converted into a [`Slot`]
    Taken,
}

/// A place in line, converted into a [`Slot`] once the task may start
struct PendingSlot {
    admission: Admission,
    state: Arc<Mutex<LimiterState>>,
}

impl PendingSlot {
    async fn granted(mut self) -> Slot {
        if let Admission::Waiting(rx) = &mut self.admission {
            // Senders stay queued until a slot is handed over, so this only
            // resolves with the hand-off.
            let _ = rx.await;
        }
        self.admission = Admission::Taken;
        Slot {
            state: Arc::clone(&self.state),
        }
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.admission, Admission::Taken) {
            Admission::Granted => release(&self.state),
            Admission::Waiting(mut rx) => {
                rx.close();
                // The slot may have been handed over after the waiter went away.
                if rx.try_recv().is_ok() {
                    release(&self.state);
                }
            }
            Admission::Taken => {}
        }
    }
}

/// A held slot, released on drop
struct Slot {
    state: Arc<Mutex<LimiterState>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        release(&self.state);
    }
}
