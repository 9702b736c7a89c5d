//! Pool identities and cascading teardown bookkeeping
//!
//! Parent pools own their children outright: [`Pool::add_child`] takes the
//! child by value, which rules out adopting one pool under two parents, and
//! destruction order falls out of structural recursion. Children are torn down
//! depth-first in adoption order before the parent's own destructors fire.
//!
//! [`Pool::add_child`]: super::Pool::add_child

use core::fmt;
use core::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique pool IDs.
///
/// IDs only give pools an identity to check markers, handles and child
/// references against; no pool invariant depends on them.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a [`Pool`](super::Pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolId(u64);

impl PoolId {
    pub(crate) fn next() -> Self {
        Self(POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Numeric value of the ID
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Reference to a child owned by a parent pool
///
/// The ID is the child's own [`PoolId`], so it stays stable while siblings
/// are destroyed or detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChildId(PoolId);

impl ChildId {
    pub(crate) fn of(pool: PoolId) -> Self {
        Self(pool)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(PoolId::from_raw(raw))
    }

    /// ID of the child pool
    #[must_use]
    pub fn pool_id(&self) -> PoolId {
        self.0
    }
}

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Summary of what a teardown released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Pools torn down, including the pool the teardown started from
    pub pools_destroyed: usize,
    /// Destructor callbacks invoked
    pub destructors_fired: usize,
    /// Bins freed
    pub bins_freed: usize,
    /// Bytes that were in use in the freed bins
    pub bytes_freed: usize,
}

impl Add for TeardownReport {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            pools_destroyed: self.pools_destroyed + rhs.pools_destroyed,
            destructors_fired: self.destructors_fired + rhs.destructors_fired,
            bins_freed: self.bins_freed + rhs.bins_freed,
            bytes_freed: self.bytes_freed + rhs.bytes_freed,
        }
    }
}

impl AddAssign for TeardownReport {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
