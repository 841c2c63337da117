//! Fixed-capacity FIFO history window.

use std::collections::VecDeque;

/// Keeps the newest `capacity` values, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryWindow<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryWindow<T> {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append, evicting the oldest value once at capacity.
    pub fn push(&mut self, value: T) {
        self.buf.push_back(value);
        if self.buf.len() > self.capacity {
            self.buf.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Contents as one oldest-first slice.
    pub fn as_slice(&mut self) -> &[T] {
        self.buf.make_contiguous()
    }
}
