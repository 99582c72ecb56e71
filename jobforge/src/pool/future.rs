//! Write-once result handles bridging submitter and worker.
//!
//! A [`JobFuture`] is the caller side of a shared one-shot slot; the worker
//! side is a [`FutureWriter`]. The slot transitions to a terminal state at
//! most once: the first completion wins and later completions are logged at
//! warn and swallowed. A writer dropped while the slot is still pending
//! (job rejected at submission, or dropped unexecuted during shutdown)
//! fails the slot so the caller never hangs.

use super::task::TaskError;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::warn;

enum SlotState<R> {
    Pending,
    Ready(Result<R, TaskError>),
    Taken,
}

struct Shared<R> {
    slot: Mutex<SlotState<R>>,
    ready: Condvar,
}

/// Caller-side handle to a job's eventual result.
///
/// Waiting consumes the handle, so "already consumed" is unrepresentable.
pub struct JobFuture<R> {
    shared: Arc<Shared<R>>,
}

impl<R> JobFuture<R> {
    /// Creates a connected future/writer pair.
    pub(crate) fn pair() -> (JobFuture<R>, FutureWriter<R>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        });
        (
            JobFuture {
                shared: Arc::clone(&shared),
            },
            FutureWriter { shared },
        )
    }

    /// True once a terminal state has been set.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.shared.slot.lock().unwrap(), SlotState::Pending)
    }

    /// Blocks until the job reaches a terminal state and returns it.
    pub fn wait(self) -> Result<R, TaskError> {
        let mut slot = self.shared.slot.lock().unwrap();
        loop {
            match std::mem::replace(&mut *slot, SlotState::Taken) {
                SlotState::Ready(result) => return result,
                state => {
                    *slot = state;
                    slot = self.shared.ready.wait(slot).unwrap();
                }
            }
        }
    }

    /// Blocks up to `timeout` for a terminal state.
    ///
    /// Returns the handle back on timeout so the caller can keep waiting.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Result<R, TaskError>, JobFuture<R>> {
        {
            let slot = self.shared.slot.lock().unwrap();
            let (mut slot, timed_out) = self
                .shared
                .ready
                .wait_timeout_while(slot, timeout, |state| {
                    matches!(state, SlotState::Pending)
                })
                .unwrap();
            if !timed_out.timed_out() {
                if let SlotState::Ready(result) = std::mem::replace(&mut *slot, SlotState::Taken) {
                    return Ok(result);
                }
            }
        }
        Err(self)
    }
}

impl<R> PartialEq for JobFuture<R> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<R> std::fmt::Debug for JobFuture<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Worker-side handle with exclusive permission to set the terminal state.
///
/// Cloneable because the completion may arrive from the task closure or from
/// the pool's abandon path; the write-once discipline arbitrates.
pub(crate) struct FutureWriter<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for FutureWriter<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> FutureWriter<R> {
    /// Sets the terminal state. The first completion wins; later calls are
    /// logged at warn and discarded.
    pub(crate) fn complete(&self, result: Result<R, TaskError>) {
        let mut slot = self.shared.slot.lock().unwrap();
        match *slot {
            SlotState::Pending => {
                *slot = SlotState::Ready(result);
                drop(slot);
                self.shared.ready.notify_all();
            }
            SlotState::Ready(_) | SlotState::Taken => {
                warn!("result already set; discarding late completion");
            }
        }
    }
}

impl<R> Drop for FutureWriter<R> {
    fn drop(&mut self) {
        // Last writer gone with the slot still pending means the task will
        // never run: fail the future instead of leaving the caller parked.
        if Arc::strong_count(&self.shared) > 2 {
            return;
        }
        let mut slot = self.shared.slot.lock().unwrap();
        if matches!(*slot, SlotState::Pending) {
            *slot = SlotState::Ready(Err(TaskError::Rejected));
            drop(slot);
            self.shared.ready.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_returns_completed_value() {
        let (future, writer) = JobFuture::pair();
        writer.complete(Ok(42));
        assert_eq!(future.wait(), Ok(42));
    }

    #[test]
    fn wait_returns_completed_error() {
        let (future, writer) = JobFuture::<i32>::pair();
        writer.complete(Err(TaskError::failed("boom")));
        assert_eq!(future.wait(), Err(TaskError::failed("boom")));
    }

    #[test]
    fn first_completion_wins() {
        let (future, writer) = JobFuture::pair();
        writer.complete(Ok(1));
        writer.complete(Ok(2));
        assert_eq!(future.wait(), Ok(1));
    }

    #[test]
    fn wait_blocks_until_completion() {
        let (future, writer) = JobFuture::pair();

        let completer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            writer.complete(Ok("done"));
        });

        assert_eq!(future.wait(), Ok("done"));
        completer.join().unwrap();
    }

    #[test]
    fn wait_timeout_returns_handle_when_pending() {
        let (future, _writer) = JobFuture::<i32>::pair();
        let future = match future.wait_timeout(Duration::from_millis(20)) {
            Err(future) => future,
            Ok(_) => panic!("future should still be pending"),
        };
        assert!(!future.is_ready());
    }

    #[test]
    fn wait_timeout_returns_value_when_ready() {
        let (future, writer) = JobFuture::pair();
        writer.complete(Ok(7));
        assert_eq!(future.wait_timeout(Duration::from_secs(1)), Ok(Ok(7)));
    }

    #[test]
    fn dropped_writer_fails_pending_future() {
        let (future, writer) = JobFuture::<i32>::pair();
        drop(writer);
        assert_eq!(future.wait(), Err(TaskError::Rejected));
    }

    #[test]
    fn dropped_writer_clone_does_not_fail_future_early() {
        let (future, writer) = JobFuture::pair();
        let clone = writer.clone();
        drop(clone);
        assert!(!future.is_ready());

        writer.complete(Ok(5));
        assert_eq!(future.wait(), Ok(5));
    }

    #[test]
    fn is_ready_reflects_state() {
        let (future, writer) = JobFuture::pair();
        assert!(!future.is_ready());
        writer.complete(Ok(0));
        assert!(future.is_ready());
    }
}
