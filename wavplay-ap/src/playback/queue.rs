//! Bounded playback queue
//!
//! FIFO with a fixed capacity. Producers never block: a push into a full
//! queue hands the item back. The single consumer waits with a timeout so it
//! can notice shutdown even when nothing is queued.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

/// Why a push was refused; the item is returned to the caller
#[derive(Debug, PartialEq, Eq)]
pub enum PushError<T> {
    Full(T),
    Closed(T),
}

/// Result of waiting for the next item
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue<T> {
    Item(T),
    TimedOut,
    Closed,
}

struct QueueInner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity FIFO shared between callers and the playback worker
pub struct BoundedQueue<T> {
    inner: Mutex<QueueInner<T>>,
    available: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Playback queue lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Append without blocking
    ///
    /// Returns the queue depth after the push.
    pub fn try_push(&self, item: T) -> Result<usize, PushError<T>> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(PushError::Closed(item));
        }
        if inner.items.len() >= self.capacity {
            return Err(PushError::Full(item));
        }
        inner.items.push_back(item);
        let depth = inner.items.len();
        drop(inner);
        self.available.notify_one();
        Ok(depth)
    }

    /// Take the oldest item, waiting at most `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Dequeue<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Dequeue::Item(item);
            }
            if inner.closed {
                return Dequeue::Closed;
            }
            let now = Instant::now();
            if now >= deadline {
                return Dequeue::TimedOut;
            }
            inner = match self.available.wait_timeout(inner, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => PoisonError::into_inner(poisoned).0,
            };
        }
    }

    /// Refuse further pushes, wake the consumer and return what was queued
    pub fn close(&self) -> Vec<T> {
        let mut inner = self.lock();
        inner.closed = true;
        let drained = inner.items.drain(..).collect();
        drop(inner);
        self.available.notify_all();
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
