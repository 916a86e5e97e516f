//! Bounded concurrency for transcoding.
//!
//! Decoding, resizing and encoding a phone photo is the most CPU- and
//! memory-hungry thing the store does. [`TranscodePool`] is a counting
//! semaphore that caps how many of those run at once. Callers block in
//! [`TranscodePool::acquire`] until a slot frees up; that blocking is the
//! upload pipeline's only backpressure.
//!
//! The pool is built once at startup and shared by reference (usually in an
//! `Arc`). Slots are returned when the [`PoolPermit`] is dropped, so an early
//! return or a panic inside a transcode never leaks one.

use std::num::NonZeroUsize;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Counting semaphore gating concurrent transcodes.
#[derive(Debug)]
pub struct TranscodePool {
    width: NonZeroUsize,
    in_flight: Mutex<usize>,
    freed: Condvar,
}

/// One held slot. Released on drop.
#[derive(Debug)]
pub struct PoolPermit<'a> {
    pool: &'a TranscodePool,
}

impl TranscodePool {
    pub fn new(width: NonZeroUsize) -> Self {
        Self {
            width,
            in_flight: Mutex::new(0),
            freed: Condvar::new(),
        }
    }

    /// Pool of `width` slots, or `None` for zero.
    pub fn with_width(width: usize) -> Option<Self> {
        NonZeroUsize::new(width).map(Self::new)
    }

    pub fn width(&self) -> usize {
        self.width.get()
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        *self.lock()
    }

    /// Block until a slot is free and take it.
    pub fn acquire(&self) -> PoolPermit<'_> {
        let mut in_flight = self.lock();
        while *in_flight >= self.width.get() {
            in_flight = self
                .freed
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_flight += 1;
        PoolPermit { pool: self }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<PoolPermit<'_>> {
        let mut in_flight = self.lock();
        if *in_flight >= self.width.get() {
            return None;
        }
        *in_flight += 1;
        Some(PoolPermit { pool: self })
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut in_flight = self.lock();
        *in_flight = in_flight.saturating_sub(1);
        drop(in_flight);
        self.freed.notify_one();
    }
}

impl Drop for PoolPermit<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}
