//! Connection accounting for the in-process backends.
//!
//! A [`Slot`] is held by every live connection and gives its place back when
//! dropped. [`Pool::close_all`] invalidates every slot handed out so far;
//! connections notice through [`Liveness::is_closed`].

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::MemoryError;

/// Shared connection counters.
#[derive(Debug, Default)]
pub struct Pool {
    active: AtomicUsize,
    max: Option<usize>,
    refusals: AtomicU32,
    generation: AtomicU64,
}

impl Pool {
    /// A pool allowing at most `max` simultaneous connections.
    pub fn new(max: Option<usize>) -> Self {
        Self {
            max,
            ..Self::default()
        }
    }

    /// Take a slot, or fail if refusals are pending or the pool is full.
    pub fn acquire(self: &Arc<Self>) -> Result<Slot, MemoryError> {
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(MemoryError::Refused);
        }

        let max = self.max.unwrap_or(usize::MAX);
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .map_err(|_| MemoryError::PoolExhausted { max })?;

        Ok(Slot {
            liveness: Liveness {
                pool: Arc::clone(self),
                generation: self.generation.load(Ordering::SeqCst),
            },
        })
    }

    /// Refuse the next `n` acquisitions.
    pub fn refuse_next(&self, n: u32) {
        self.refusals.store(n, Ordering::SeqCst);
    }

    /// Mark every slot handed out so far as closed.
    pub fn close_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of slots currently held.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Whether a connection has been closed underneath its holder.
#[derive(Debug, Clone)]
pub struct Liveness {
    pool: Arc<Pool>,
    generation: u64,
}

impl Liveness {
    /// Returns `true` once [`Pool::close_all`] ran after this slot was taken.
    pub fn is_closed(&self) -> bool {
        self.pool.generation.load(Ordering::SeqCst) != self.generation
    }
}

/// One held connection slot.
#[derive(Debug)]
pub struct Slot {
    liveness: Liveness,
}

impl Slot {
    /// Closed-state check sharing this slot's generation.
    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Shorthand for `self.liveness().is_closed()`.
    pub fn is_closed(&self) -> bool {
        self.liveness.is_closed()
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.liveness.pool.active.fetch_sub(1, Ordering::SeqCst);
    }
}
