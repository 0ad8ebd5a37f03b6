//! Fixed-capacity ring of the most recent debug events.
//!
//! [`RingBuffer`] is the plain, single-owner data structure. [`EventBuffer`]
//! is the cloneable handle shared between the ingest path and the HTTP
//! handlers; every append, snapshot and reset goes through one mutex.
//!
//! # Ordering
//!
//! Snapshots are returned oldest first. Once the ring has wrapped, the
//! oldest retained event is the one in the slot the next write will
//! overwrite, so a snapshot walks the ring starting at the write cursor.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::event::Event;

/// Errors raised when constructing a buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// A ring cannot have zero slots.
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,
}

/// Circular store of the last `capacity` events.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// Event slots; `None` until first written.
    slots: Vec<Option<Event>>,
    /// Index of the slot the next append writes to.
    cursor: usize,
    /// Number of occupied slots.
    len: usize,
}

impl RingBuffer {
    /// Create an empty ring with `capacity` slots.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: vec![None; capacity.get()],
            cursor: 0,
            len: 0,
        }
    }

    /// Write `event` into the current slot and advance the cursor,
    /// overwriting the oldest event once the ring is full.
    pub fn append(&mut self, event: Event) {
        let capacity = self.slots.len();
        if let Some(slot) = self.slots.get_mut(self.cursor) {
            if slot.replace(event).is_none() {
                self.len = self.len.saturating_add(1);
            }
        }
        self.cursor = self
            .cursor
            .checked_add(1)
            .and_then(|next| next.checked_rem(capacity))
            .unwrap_or(0);
    }

    /// Copy out every occupied slot, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.slots
            .iter()
            .cycle()
            .skip(self.cursor)
            .take(self.slots.len())
            .flatten()
            .cloned()
            .collect()
    }

    /// Drop all events and reinitialize with `capacity` empty slots.
    pub fn reset(&mut self, capacity: NonZeroUsize) {
        *self = Self::new(capacity);
    }

    /// Number of events currently retained.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no events are retained.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Shared, thread-safe handle to a [`RingBuffer`].
///
/// Cloning the handle shares the same ring. The lock is never held across
/// an `.await`, so a plain [`std::sync::Mutex`] is used.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    inner: Arc<Mutex<RingBuffer>>,
}

impl EventBuffer {
    /// Create a shared ring with `capacity` slots.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingBuffer::new(capacity))),
        }
    }

    /// Create a shared ring, rejecting a zero capacity.
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(BufferError::ZeroCapacity)
    }

    /// Append one event.
    pub fn append(&self, event: Event) {
        self.lock().append(event);
    }

    /// Point-in-time copy of all retained events, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.lock().snapshot()
    }

    /// Discard every event and start over with `capacity` slots.
    pub fn reset(&self, capacity: NonZeroUsize) {
        self.lock().reset(capacity);
    }

    /// Number of events currently retained.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Acquire the ring. A writer that panicked mid-append cannot leave a
    /// slot half-written, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, RingBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
