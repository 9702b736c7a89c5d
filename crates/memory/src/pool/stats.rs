//! Pool diagnostics
//!
//! Snapshots are plain values computed on demand; the pool keeps no counters
//! besides the live allocation count.

use core::fmt;
use core::ops::{Add, AddAssign};

/// Per-bin occupancy, as reported by [`Pool::bins`](super::Pool::bins)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinStats {
    /// Usable size of the bin (bytes)
    pub capacity: usize,
    /// Bump cursor of the bin (bytes)
    pub used: usize,
}

impl BinStats {
    /// Bytes still available at the end of the bin
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}

impl fmt::Display for BinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} bytes", self.used, self.capacity)
    }
}

/// Snapshot of one pool, or of a pool and all its descendants
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of pools covered by the snapshot
    pub pools: usize,

    /// Number of bins
    pub bins: usize,

    /// Sum of bin capacities (bytes)
    pub capacity: usize,

    /// Sum of bin cursors (bytes)
    ///
    /// Includes the spare tails of bins that were left behind when a request
    /// did not fit, so it can exceed the sum of live allocation sizes.
    pub used: usize,

    /// Allocations made and not yet rolled back
    pub live_allocations: usize,

    /// Destructors registered and not yet fired
    pub pending_destructors: usize,

    /// Temporary markers begun and not yet ended
    pub open_markers: usize,

    /// Direct children (summed over every pool for hierarchy snapshots)
    pub children: usize,
}

impl PoolStats {
    /// Percentage of capacity behind the bump cursors (0-100)
    #[must_use]
    pub fn utilization_percent(&self) -> u8 {
        if self.capacity == 0 {
            return 0;
        }

        let percent = self.used.saturating_mul(100) / self.capacity;
        u8::try_from(percent.min(100)).unwrap_or(100)
    }

    /// Whether the snapshot covers no memory and no pending work
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.bins == 0 && self.pending_destructors == 0 && self.open_markers == 0
    }
}

impl Add for PoolStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            pools: self.pools + rhs.pools,
            bins: self.bins + rhs.bins,
            capacity: self.capacity + rhs.capacity,
            used: self.used + rhs.used,
            live_allocations: self.live_allocations + rhs.live_allocations,
            pending_destructors: self.pending_destructors + rhs.pending_destructors,
            open_markers: self.open_markers + rhs.open_markers,
            children: self.children + rhs.children,
        }
    }
}

impl AddAssign for PoolStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pools: {}, bins: {}, used: {}/{} bytes ({}%)",
            self.pools,
            self.bins,
            self.used,
            self.capacity,
            self.utilization_percent()
        )?;
        write!(
            f,
            "live allocations: {}, pending destructors: {}, open markers: {}, children: {}",
            self.live_allocations, self.pending_destructors, self.open_markers, self.children
        )
    }
}
