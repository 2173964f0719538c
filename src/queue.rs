//! The pending-track FIFO shared by the session (producers) and the worker
//! (single consumer).
//!
//! A single `Condvar` is used as the "something changed" signal: either a
//! track was enqueued or [`TrackQueue::notify`] asked the consumer to
//! re-check its flags. The consumer never blocks longer than the timeout it
//! passes in, so it keeps observing the shutdown flag.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::track::Track;

#[derive(Default)]
pub struct TrackQueue {
    inner: Mutex<VecDeque<Track>>,
    cv: Condvar,
    // Set by `notify`, consumed by the next empty-handed `dequeue_or_wait`.
    nudged: AtomicBool,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking producer must not take the queued tracks down with it.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Track>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one track and wake the consumer.
    pub fn enqueue(&self, track: Track) {
        self.lock().push_back(track);
        self.cv.notify_one();
    }

    /// Append `tracks` contiguously, preserving their order.
    ///
    /// Returns the number of tracks appended.
    pub fn enqueue_all<I>(&self, tracks: I) -> usize
    where
        I: IntoIterator<Item = Track>,
    {
        let mut q = self.lock();
        let before = q.len();
        q.extend(tracks);
        let added = q.len() - before;
        drop(q);
        if added > 0 {
            self.cv.notify_one();
        }
        added
    }

    /// Pop the head, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout, or early when [`TrackQueue::notify`] was
    /// called and nothing is queued. Spurious wakeups keep waiting.
    pub fn dequeue_or_wait(&self, timeout: Duration) -> Option<Track> {
        let deadline = Instant::now() + timeout;
        let mut q = self.lock();
        loop {
            if let Some(t) = q.pop_front() {
                return Some(t);
            }
            if self.nudged.swap(false, Ordering::AcqRel) {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, res) = self
                .cv
                .wait_timeout(q, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            q = guard;
            if res.timed_out() {
                return q.pop_front();
            }
        }
    }

    /// Wake a blocked consumer without enqueuing anything.
    ///
    /// If no consumer is waiting, the next `dequeue_or_wait` that finds the
    /// queue empty returns at once instead.
    pub fn notify(&self) {
        {
            let _q = self.lock();
            self.nudged.store(true, Ordering::Release);
        }
        self.cv.notify_all();
    }

    /// Ordered copy of the pending tracks.
    pub fn snapshot(&self) -> Vec<Track> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop everything still pending; returns how many tracks were discarded.
    pub fn clear(&self) -> usize {
        let mut q = self.lock();
        let n = q.len();
        q.clear();
        n
    }
}
