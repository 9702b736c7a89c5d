//! Temporary-memory markers
//!
//! A [`Marker`] snapshots the pool as a `(bin count, newest-bin cursor,
//! destructor count)` triple. Ending it fires the destructors registered
//! since, drops the bins created since, restores the cursor and truncates the
//! registry. Markers nest and must be ended innermost first.
//!
//! # Examples
//!
//! ```
//! use mem_pool::Pool;
//!
//! let mut pool = Pool::new();
//! let kept = pool.allocate(16, true).unwrap();
//!
//! {
//!     let mut scope = pool.temporary();
//!     let scratch = scope.allocate(1024, false).unwrap();
//!     assert!(scope.get(&scratch).is_some());
//!     // scratch is rolled back when the scope drops
//! }
//!
//! assert!(pool.get(&kept).is_some());
//! assert_eq!(pool.used(), 16);
//! ```

use core::ops::{Deref, DerefMut};

use super::bin::ChainPosition;
use super::{Pool, PoolId};
use crate::error::{MemoryError, MemoryResult};

/// Snapshot token returned by [`Pool::begin_temporary`]
///
/// The marker owns no resources. It is move-only so it can be handed back to
/// [`Pool::end_temporary`] at most once. Dropping it without ending leaves the
/// scope open, and every enclosing marker is then rejected as out of order
/// until the pool is cleared.
#[must_use = "a marker must be passed to Pool::end_temporary to roll back"]
#[derive(Debug, PartialEq, Eq)]
pub struct Marker {
    pub(super) pool: PoolId,
    pub(super) serial: u64,
    pub(super) position: ChainPosition,
    pub(super) destructor_count: usize,
    pub(super) live_allocations: usize,
}

impl Marker {
    /// Pool the marker was taken on
    #[must_use]
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// Serial of the marker, unique within its pool
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Whether the marker was taken on a pool without bins
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.position.bin_count == 0
    }
}

/// Stack of open marker serials for one pool
#[derive(Debug, Default)]
pub(crate) struct MarkerStack {
    open: Vec<u64>,
    next_serial: u64,
}

impl MarkerStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.open.push(serial);
        serial
    }

    /// Checks that `marker` is the innermost open marker of `pool`
    pub(crate) fn check(&self, pool: PoolId, marker: &Marker) -> MemoryResult<()> {
        if marker.pool != pool {
            return Err(MemoryError::foreign_marker(marker.pool, pool));
        }

        match self.open.last() {
            Some(&top) if top == marker.serial => Ok(()),
            Some(&top) if self.open.contains(&marker.serial) => {
                Err(MemoryError::marker_out_of_order(top, marker.serial))
            }
            _ => Err(MemoryError::marker_invalidated(marker.serial)),
        }
    }

    /// Pops the innermost marker; call only after [`check`](Self::check)
    pub(crate) fn pop(&mut self) {
        self.open.pop();
    }

    /// Forgets every marker opened after `serial`
    ///
    /// Returns the innermost forgotten serial, or `None` when `serial` was
    /// already the innermost or is not open at all.
    pub(crate) fn discard_above(&mut self, serial: u64) -> Option<u64> {
        let index = self.open.iter().position(|&open| open == serial)?;
        let innermost = self.open.last().copied().filter(|&top| top != serial)?;
        self.open.truncate(index + 1);
        Some(innermost)
    }

    /// Forgets every open marker; they will fail validation from now on
    pub(crate) fn invalidate_all(&mut self) -> usize {
        let count = self.open.len();
        self.open.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.open.len()
    }
}

/// RAII guard for a temporary-memory scope
///
/// Created by [`Pool::temporary`]. Dereferences to the pool so allocations
/// go through the guard, and ends its marker when dropped. Use
/// [`end`](Self::end) to observe errors, or [`keep`](Self::keep) to commit the
/// allocations to the enclosing scope.
///
/// # Panics
///
/// Dropping the guard panics if its marker cannot be ended, e.g. because a
/// marker begun inside the scope is still open. No panic is raised while the
/// thread is already unwinding.
#[must_use = "TemporaryScope rolls back immediately unless held"]
pub struct TemporaryScope<'a> {
    pool: &'a mut Pool,
    marker: Option<Marker>,
}

impl<'a> TemporaryScope<'a> {
    pub(super) fn new(pool: &'a mut Pool) -> Self {
        let marker = pool.begin_temporary();
        Self {
            pool,
            marker: Some(marker),
        }
    }

    /// Ends the scope, rolling the pool back to where it began
    pub fn end(mut self) -> MemoryResult<()> {
        match self.marker.take() {
            Some(marker) => self.pool.end_temporary(marker),
            None => Ok(()),
        }
    }

    /// Closes the scope without rolling back
    ///
    /// Allocations and destructors made inside the scope now belong to the
    /// enclosing scope (or the pool itself).
    pub fn keep(mut self) -> MemoryResult<()> {
        match self.marker.take() {
            Some(marker) => self.pool.keep_temporary(marker),
            None => Ok(()),
        }
    }

    /// Serial of the scope's marker
    #[must_use]
    pub fn serial(&self) -> Option<u64> {
        self.marker.as_ref().map(Marker::serial)
    }
}

impl Deref for TemporaryScope<'_> {
    type Target = Pool;

    fn deref(&self) -> &Pool {
        self.pool
    }
}

impl DerefMut for TemporaryScope<'_> {
    fn deref_mut(&mut self) -> &mut Pool {
        self.pool
    }
}

impl Drop for TemporaryScope<'_> {
    fn drop(&mut self) {
        if let Some(marker) = self.marker.take()
            && let Err(error) = self.pool.end_temporary(marker)
            && !std::thread::panicking()
        {
            panic!("temporary scope dropped without being rolled back: {error}");
        }
    }
}

impl core::fmt::Debug for TemporaryScope<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TemporaryScope")
            .field("pool", &self.pool.id())
            .field("marker", &self.marker)
            .finish()
    }
}
