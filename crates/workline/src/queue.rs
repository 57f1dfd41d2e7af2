//! Bounded queues connecting pipeline stages.
//!
//! A [`Queue`] is a cloneable handle to one bounded channel. Any number of
//! producers and consumers may share it; each value is received by exactly one
//! consumer. Closing is explicit: after [`Queue::close`] no further sends are
//! accepted, values already buffered are still delivered, and consumers see
//! `None` once the buffer is empty.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

pub use tokio::sync::mpsc::error::SendError;

struct Shared<T> {
    capacity: usize,
    /// Producer side. `None` once the queue has been closed.
    tx: Mutex<Option<mpsc::Sender<T>>>,
    /// Consumer side, shared by every consumer of the queue.
    rx: tokio::sync::Mutex<mpsc::Receiver<T>>,
}

/// Handle to a bounded multi-producer, multi-consumer queue.
///
/// Clones refer to the same queue; use [`Queue::same_queue`] to compare
/// identity.
pub struct Queue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("id", &Arc::as_ptr(&self.shared))
            .field("capacity", &self.shared.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Queue<T> {
    /// Create a queue holding at most `capacity` buffered values.
    ///
    /// A capacity of zero is raised to one.
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            shared: Arc::new(Shared {
                capacity,
                tx: Mutex::new(Some(tx)),
                rx: tokio::sync::Mutex::new(rx),
            }),
        }
    }

    /// Maximum number of buffered values.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Whether both handles refer to the same queue.
    pub fn same_queue(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.shared, &b.shared)
    }

    /// Send a value, waiting for room if the queue is full.
    ///
    /// Fails, handing the value back, if the queue is closed.
    pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
        let tx = self.sender().clone();
        match tx {
            Some(tx) => tx.send(value).await,
            None => Err(SendError(value)),
        }
    }

    /// Receive the next value.
    ///
    /// Returns `None` once the queue is closed and every buffered value has
    /// been delivered. Cancel-safe: dropping the future never loses a value.
    pub async fn recv(&self) -> Option<T> {
        self.shared.rx.lock().await.recv().await
    }

    /// Stop accepting values. Idempotent.
    pub fn close(&self) {
        self.sender().take();
    }

    /// Whether [`Queue::close`] has been called since the last reopen.
    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    /// Give a closed queue a fresh, empty channel, keeping its identity.
    ///
    /// Open queues are left untouched. Returns whether the queue was reopened.
    /// Values still buffered in the old channel are discarded. Must not be
    /// called while consumers of the previous channel are still waiting.
    pub fn reopen(&self) -> bool {
        let mut tx = self.sender();
        if tx.is_some() {
            return false;
        }

        let Ok(mut rx) = self.shared.rx.try_lock() else {
            return false;
        };

        let (new_tx, new_rx) = mpsc::channel(self.shared.capacity);
        *rx = new_rx;
        *tx = Some(new_tx);
        true
    }

    fn sender(&self) -> MutexGuard<'_, Option<mpsc::Sender<T>>> {
        self.shared.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
