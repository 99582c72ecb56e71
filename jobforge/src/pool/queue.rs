//! Bounded priority job queue with producer backpressure and shutdown.
//!
//! Ordering is priority descending, then push order ascending: the heap
//! stores a monotonic sequence number per entry so ties within a priority
//! are deterministic FIFO.
//!
//! One internal mutex guards the heap; two condition variables (`not_empty`,
//! `not_full`) park consumers and producers. `shutdown` flips a monotone
//! flag and wakes every waiter so blocked producers and consumers can
//! observe the closed state.

use super::task::Job;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};

/// Result of a blocking [`JobQueue::pop`].
#[derive(Debug)]
pub enum Popped {
    /// The highest-priority job at the time of the pop.
    Job(Job),
    /// The queue is shut down and drained; no more jobs will ever arrive.
    Closed,
}

struct QueuedJob {
    job: Job,
    /// Copied out of the metadata so ordering doesn't borrow the job.
    priority: i32,
    seq: u64,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority first, then earlier sequence number.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueInner {
    heap: BinaryHeap<QueuedJob>,
    next_seq: u64,
    shutdown: bool,
}

/// Bounded priority queue shared between producers and the worker threads.
pub struct JobQueue {
    inner: Mutex<QueueInner>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl JobQueue {
    /// Creates a queue holding at most `capacity` jobs.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::with_capacity(capacity),
                next_seq: 0,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Enqueues a job, blocking while the queue is full.
    ///
    /// Returns `true` if the job was accepted. Once the queue is shut down
    /// the push is a no-op and returns `false`, including for producers that
    /// were blocked on a full queue when shutdown arrived.
    pub fn push(&self, job: Job) -> bool {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.shutdown {
                return false;
            }
            if inner.heap.len() < self.capacity {
                break;
            }
            inner = self.not_full.wait(inner).unwrap();
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let priority = job.meta.priority;
        inner.heap.push(QueuedJob { job, priority, seq });
        drop(inner);

        self.not_empty.notify_one();
        true
    }

    /// Dequeues the highest-priority job, blocking while the queue is empty.
    ///
    /// Returns [`Popped::Closed`] once the queue is shut down and drained.
    pub fn pop(&self) -> Popped {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(entry) = inner.heap.pop() {
                drop(inner);
                self.not_full.notify_one();
                return Popped::Job(entry.job);
            }
            if inner.shutdown {
                return Popped::Closed;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Dequeues the highest-priority job without blocking.
    pub fn try_pop(&self) -> Option<Job> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.heap.pop()?;
        drop(inner);
        self.not_full.notify_one();
        Some(entry.job)
    }

    /// Current number of queued jobs.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().heap.len()
    }

    /// True if no jobs are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().heap.is_empty()
    }

    /// Maximum number of queued jobs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once [`shutdown`](JobQueue::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().unwrap().shutdown
    }

    /// Closes the queue: subsequent pushes are rejected and every parked
    /// producer and consumer is woken. Idempotent. Jobs already queued stay
    /// poppable until the queue drains.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.shutdown = true;
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}
