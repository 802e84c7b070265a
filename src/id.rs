// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::EdgeId;

/// Source of high-resolution timestamps for an [EdgeIdGenerator].
pub trait Clock: Send + Sync {
    /// Returns the current time in nanoseconds. Only the low bits are used,
    /// so the epoch is irrelevant.
    fn now_nanos(&self) -> u64;
}

/// [Clock] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// [Clock] which always returns the same instant.
///
/// With `FixedClock(0)`, an [EdgeIdGenerator] yields 0, 1, 2, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_nanos(&self) -> u64 {
        self.0
    }
}

/// Generates 32-bit [Edge](crate::Edge) ids without a central sequence.
///
/// An id is the low 16 bits of a timestamp followed by the low 16 bits
/// of an atomic counter. Ids are unlikely, but not guaranteed, to be unique;
/// [Graph::add_edge](crate::Graph::add_edge) refuses ids which are already taken.
///
/// The generator may be shared between concurrent ingestions.
pub struct EdgeIdGenerator {
    clock: Box<dyn Clock>,
    counter: AtomicU32,
}

impl EdgeIdGenerator {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock<C: Clock + 'static>(clock: C) -> Self {
        Self {
            clock: Box::new(clock),
            counter: AtomicU32::new(0),
        }
    }

    pub fn next_id(&self) -> EdgeId {
        let nanos = (self.clock.now_nanos() & 0xFFFF) as u32;
        let count = self.counter.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
        (nanos << 16) | count
    }
}

impl Default for EdgeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EdgeIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeIdGenerator")
            .field("counter", &self.counter.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
