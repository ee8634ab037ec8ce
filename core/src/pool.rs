//! Pooled per-request scratch resources (spec.md §5).
//!
//! Two pools exist: one for validation (path buffer + result), one for body byte
//! buffers. Both are reset before being returned to the pool so cross-request
//! contamination cannot occur, and neither is retained beyond a single request.

use alloc::{string::String, vec::Vec};
use std::sync::Mutex;

use crate::validate::ValidateResult;

/// A reusable buffer that accumulates dotted/JSON-pointer-like path segments, e.g.
/// `body.sub.items[3].name`.
#[derive(Debug, Default, Clone)]
pub struct PathBuf {
    buffer: String,
    marks: Vec<usize>,
}

impl PathBuf {
    /// An empty path buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
            marks: Vec::new(),
        }
    }

    /// Push a named segment (`.name`), recording a mark so [`Self::pop`] can undo it.
    pub fn push_segment(&mut self, name: &str) {
        self.marks.push(self.buffer.len());
        if !self.buffer.is_empty() {
            self.buffer.push('.');
        }
        self.buffer.push_str(name);
    }

    /// Push an index segment (`[i]`), recording a mark so [`Self::pop`] can undo it.
    pub fn push_index(&mut self, index: usize) {
        self.marks.push(self.buffer.len());
        self.buffer.push('[');
        // `usize` formatting never allocates beyond the buffer already reserved by push.
        self.buffer
            .push_str(itoa_buf(index).as_str());
        self.buffer.push(']');
    }

    /// Undo the most recent `push_segment`/`push_index`.
    pub fn pop(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.buffer.truncate(mark);
        }
    }

    /// The current path as a string slice, e.g. `body.sub.items[3].name`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Clear the buffer, ready for reuse.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.marks.clear();
    }
}

fn itoa_buf(value: usize) -> String {
    let mut s = String::new();
    let mut v = value;
    if v == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while v > 0 {
        digits.push(b'0' + (v % 10) as u8);
        v /= 10;
    }
    digits.reverse();
    s.push_str(core::str::from_utf8(&digits).unwrap_or("0"));
    s
}

/// A pooled validation scratch pair: a [`PathBuf`] and a [`ValidateResult`].
#[derive(Debug, Default)]
pub struct ValidateScratch {
    /// The reusable path buffer.
    pub path: PathBuf,
    /// The reusable error accumulator.
    pub result: ValidateResult,
}

impl ValidateScratch {
    fn reset(&mut self) {
        self.path.reset();
        self.result.reset();
    }
}

/// Object pool for [`ValidateScratch`] values, checked out once per request dispatch.
#[derive(Debug, Default)]
pub struct ValidatePool {
    slots: Mutex<Vec<ValidateScratch>>,
}

impl ValidatePool {
    /// An empty pool; slots are created lazily on first checkout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Check out a scratch pair, creating one if the pool is empty.
    #[must_use]
    pub fn checkout(&self) -> ValidateScratch {
        self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop().unwrap_or_default()
    }

    /// Reset and return a scratch pair to the pool.
    pub fn release(&self, mut scratch: ValidateScratch) {
        scratch.reset();
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(scratch);
    }
}

/// Object pool for request-body byte buffers.
#[derive(Debug, Default)]
pub struct BodyPool {
    slots: Mutex<Vec<Vec<u8>>>,
}

impl BodyPool {
    /// An empty pool; buffers are created lazily on first checkout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Check out a cleared buffer with at least `capacity_hint` bytes reserved.
    #[must_use]
    pub fn checkout(&self, capacity_hint: usize) -> Vec<u8> {
        let mut buffer = self
            .slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        buffer.clear();
        if buffer.capacity() < capacity_hint {
            buffer.reserve(capacity_hint - buffer.capacity());
        }
        buffer
    }

    /// Clear and return a buffer to the pool.
    pub fn release(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_buf_push_pop_round_trips() {
        let mut path = PathBuf::new();
        path.push_segment("body");
        path.push_segment("items");
        path.push_index(3);
        path.push_segment("name");
        assert_eq!(path.as_str(), "body.items[3].name");
        path.pop();
        assert_eq!(path.as_str(), "body.items[3]");
        path.pop();
        path.pop();
        path.pop();
        assert_eq!(path.as_str(), "");
    }

    #[test]
    fn validate_pool_recycles_scratch() {
        let pool = ValidatePool::new();
        let mut scratch = pool.checkout();
        scratch.path.push_segment("body");
        pool.release(scratch);
        let scratch = pool.checkout();
        assert_eq!(scratch.path.as_str(), "");
    }

    #[test]
    fn body_pool_clears_buffers_on_release() {
        let pool = BodyPool::new();
        let mut buffer = pool.checkout(16);
        buffer.extend_from_slice(b"hello");
        pool.release(buffer);
        let buffer = pool.checkout(16);
        assert!(buffer.is_empty());
    }
}
