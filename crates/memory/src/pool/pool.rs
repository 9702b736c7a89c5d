//! The [`Pool`] type
//!
//! A pool owns a chain of bins it bump-allocates from, a registry of
//! deferred destructors, a stack of open temporary markers and the child
//! pools adopted for cascading teardown. Everything it hands out is a plain
//! [`Allocation`] handle resolved through the pool, so no borrow outlives a
//! rollback.

use core::fmt;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

use super::bin::{Allocation, BinChain};
use super::destructor::DestructorRegistry;
use super::hierarchy::{ChildId, PoolId, TeardownReport};
use super::marker::{Marker, MarkerStack, TemporaryScope};
use super::stats::{BinStats, PoolStats};
use crate::core::config::PoolConfig;
use crate::error::{MemoryError, MemoryResult};

/// Hierarchical bump-allocating memory pool
///
/// # Examples
///
/// ```
/// use mem_pool::Pool;
///
/// let mut root = Pool::new();
/// let child = root.new_child();
///
/// let pool = root.child_mut(child).unwrap();
/// let greeting = pool.allocate_str("hello").unwrap();
/// assert_eq!(pool.get_str(&greeting), Some("hello"));
///
/// let report = root.destroy();
/// assert_eq!(report.pools_destroyed, 2);
/// ```
pub struct Pool {
    id: PoolId,
    config: PoolConfig,
    bins: BinChain,
    destructors: DestructorRegistry,
    markers: MarkerStack,
    children: Vec<Pool>,
    live_allocations: usize,
}

impl Pool {
    /// Creates an empty pool with the default configuration
    ///
    /// No storage is obtained until the first allocation.
    pub fn new() -> Self {
        Self::from_valid_config(PoolConfig::default())
    }

    /// Creates an empty pool with a custom configuration
    pub fn with_config(config: PoolConfig) -> MemoryResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PoolConfig) -> Self {
        let pool = Self {
            id: PoolId::next(),
            config,
            bins: BinChain::new(),
            destructors: DestructorRegistry::new(),
            markers: MarkerStack::new(),
            children: Vec::new(),
            live_allocations: 0,
        };

        #[cfg(feature = "logging")]
        debug!(
            pool = %pool.id,
            name = pool.config.name.as_deref().unwrap_or(""),
            min_bin_size = pool.config.min_bin_size,
            "created pool"
        );

        pool
    }

    /// Changes the minimum capacity of bins created from now on
    ///
    /// Existing bins keep their size.
    pub fn set_min_bin_size(&mut self, min_bin_size: usize) -> MemoryResult<()> {
        let config = self.config.clone().with_min_bin_size(min_bin_size);
        config.validate()?;
        self.config = config;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Bump allocation
    // ------------------------------------------------------------------------

    /// Carves `size` bytes out of the pool
    ///
    /// Returns `None` for `size == 0` without touching the pool. When `zeroed`
    /// is false the bytes are whatever the bin held last.
    pub fn allocate(&mut self, size: usize, zeroed: bool) -> Option<Allocation> {
        if size == 0 {
            return None;
        }

        let slot = self
            .bins
            .bump(self.id, size, zeroed, self.config.min_bin_size);
        self.live_allocations += 1;

        #[cfg(feature = "logging")]
        trace!(
            pool = %self.id,
            size,
            bin = slot.bin_index,
            offset = slot.offset,
            zeroed,
            "allocated"
        );

        Some(BinChain::handle(self.id, slot, size))
    }

    /// Allocates with zeroing taken from [`PoolConfig::zero_by_default`]
    pub fn allocate_default(&mut self, size: usize) -> Option<Allocation> {
        self.allocate(size, self.config.zero_by_default)
    }

    /// Allocates room for `count` elements of `elem_size` bytes each
    pub fn allocate_array(
        &mut self,
        count: usize,
        elem_size: usize,
        zeroed: bool,
    ) -> MemoryResult<Option<Allocation>> {
        let size = count
            .checked_mul(elem_size)
            .ok_or_else(|| MemoryError::size_overflow("allocate_array"))?;
        Ok(self.allocate(size, zeroed))
    }

    /// Copies `bytes` into the pool
    pub fn allocate_copy(&mut self, bytes: &[u8]) -> Option<Allocation> {
        let allocation = self.allocate(bytes.len(), false)?;
        if let Some(target) = self.bins.bytes_mut(&allocation) {
            target.copy_from_slice(bytes);
        }
        Some(allocation)
    }

    /// Copies a string into the pool; read it back with [`get_str`](Self::get_str)
    pub fn allocate_str(&mut self, text: &str) -> Option<Allocation> {
        self.allocate_copy(text.as_bytes())
    }

    // ------------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------------

    /// Bytes behind a handle
    ///
    /// `None` for handles from other pools and for allocations that were
    /// rolled back or freed.
    pub fn get(&self, allocation: &Allocation) -> Option<&[u8]> {
        if allocation.pool() != self.id {
            return None;
        }
        self.bins.bytes(allocation)
    }

    /// Mutable bytes behind a handle
    pub fn get_mut(&mut self, allocation: &Allocation) -> Option<&mut [u8]> {
        if allocation.pool() != self.id {
            return None;
        }
        self.bins.bytes_mut(allocation)
    }

    /// Bytes behind a handle as UTF-8
    pub fn get_str(&self, allocation: &Allocation) -> Option<&str> {
        self.get(allocation)
            .and_then(|bytes| core::str::from_utf8(bytes).ok())
    }

    /// Whether a handle still resolves in this pool
    pub fn contains(&self, allocation: &Allocation) -> bool {
        allocation.pool() == self.id && self.bins.is_live(allocation)
    }

    // ------------------------------------------------------------------------
    // Destructors
    // ------------------------------------------------------------------------

    /// Allocates and registers `callback` to run when the enclosing scope ends
    ///
    /// The callback receives the allocation's bytes while they are still
    /// intact. For `size == 0` nothing is allocated and the callback is
    /// dropped without running.
    pub fn allocate_with_destructor<F>(
        &mut self,
        size: usize,
        zeroed: bool,
        callback: F,
    ) -> Option<Allocation>
    where
        F: FnOnce(&[u8]) + 'static,
    {
        let allocation = self.allocate(size, zeroed)?;
        self.destructors
            .register(Some(allocation), Box::new(callback));
        Some(allocation)
    }

    /// Registers `callback` for an allocation made earlier
    ///
    /// The destructor belongs to the scope open at registration time, which
    /// may be narrower than the scope of the allocation.
    pub fn attach_destructor<F>(&mut self, allocation: &Allocation, callback: F) -> MemoryResult<()>
    where
        F: FnOnce(&[u8]) + 'static,
    {
        if allocation.pool() != self.id {
            return Err(MemoryError::foreign_allocation(allocation.pool(), self.id));
        }
        if !self.bins.is_live(allocation) {
            return Err(MemoryError::stale_allocation(self.id));
        }

        self.destructors
            .register(Some(*allocation), Box::new(callback));
        Ok(())
    }

    /// Registers a hook that runs when the enclosing scope ends
    pub fn on_teardown<F>(&mut self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.destructors
            .register(None, Box::new(move |_: &[u8]| callback()));
    }

    // ------------------------------------------------------------------------
    // Temporary memory
    // ------------------------------------------------------------------------

    /// Opens a temporary-memory scope
    ///
    /// Valid on a pool without bins; ending the marker then returns the pool
    /// to that pristine state.
    pub fn begin_temporary(&mut self) -> Marker {
        let serial = self.markers.push();
        let marker = Marker {
            pool: self.id,
            serial,
            position: self.bins.position(),
            destructor_count: self.destructors.len(),
            live_allocations: self.live_allocations,
        };

        #[cfg(feature = "logging")]
        debug!(
            pool = %self.id,
            marker = serial,
            bins = marker.position.bin_count,
            used = marker.position.newest_used,
            destructors = marker.destructor_count,
            "began temporary scope"
        );

        marker
    }

    /// Ends the innermost temporary scope
    ///
    /// Fires the destructors registered since `marker` was taken (newest
    /// first), frees the bins created since, and restores the cursor of the
    /// bin that was newest at that time.
    pub fn end_temporary(&mut self, marker: Marker) -> MemoryResult<()> {
        self.markers.check(self.id, &marker)?;
        self.markers.pop();

        let fired = self
            .destructors
            .fire_from(marker.destructor_count, &self.bins);
        let released = self
            .bins
            .rollback(marker.position, self.config.release_pattern);
        self.live_allocations = marker.live_allocations;

        #[cfg(feature = "logging")]
        debug!(
            pool = %self.id,
            marker = marker.serial,
            destructors = fired,
            bins = released.bins,
            bytes = released.bytes,
            "ended temporary scope"
        );
        #[cfg(not(feature = "logging"))]
        let _ = (fired, released);

        Ok(())
    }

    /// Closes the innermost temporary scope without rolling back
    ///
    /// Its allocations and destructors now belong to the enclosing scope.
    pub fn keep_temporary(&mut self, marker: Marker) -> MemoryResult<()> {
        self.markers.check(self.id, &marker)?;
        self.markers.pop();

        #[cfg(feature = "logging")]
        debug!(pool = %self.id, marker = marker.serial, "kept temporary scope");

        Ok(())
    }

    /// Opens a temporary scope ended when the returned guard drops
    pub fn temporary(&mut self) -> TemporaryScope<'_> {
        TemporaryScope::new(self)
    }

    /// Runs `f` inside a temporary scope and rolls back afterwards
    ///
    /// Markers that `f` begins and leaves open are discarded together with
    /// the scope: the pool is rolled back all the same, and the call fails
    /// with [`MemoryError::MarkerOutOfOrder`] to report the leak. The leaked
    /// markers can no longer be ended.
    pub fn with_temporary<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> MemoryResult<R> {
        let marker = self.begin_temporary();
        let serial = marker.serial;
        let result = f(self);

        let leaked = self.markers.discard_above(serial);
        self.end_temporary(marker)?;

        match leaked {
            Some(innermost) => Err(MemoryError::marker_out_of_order(innermost, serial)),
            None => Ok(result),
        }
    }

    /// Number of markers begun and not yet ended
    pub fn open_markers(&self) -> usize {
        self.markers.len()
    }

    // ------------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------------

    /// Takes ownership of `child`; it is destroyed before this pool
    pub fn add_child(&mut self, child: Self) -> ChildId {
        let id = ChildId::of(child.id);

        #[cfg(feature = "logging")]
        debug!(pool = %self.id, child = %id, "adopted child pool");

        self.children.push(child);
        id
    }

    /// Creates a child with this pool's configuration
    pub fn new_child(&mut self) -> ChildId {
        let child = Self::from_valid_config(self.config.clone());
        self.add_child(child)
    }

    fn child_index(&self, child: ChildId) -> MemoryResult<usize> {
        self.children
            .iter()
            .position(|pool| pool.id == child.pool_id())
            .ok_or_else(|| MemoryError::child_not_found(child))
    }

    /// Direct child by ID
    pub fn child(&self, child: ChildId) -> Option<&Self> {
        self.children.iter().find(|pool| pool.id == child.pool_id())
    }

    /// Direct child by ID, mutably
    pub fn child_mut(&mut self, child: ChildId) -> Option<&mut Self> {
        self.children
            .iter_mut()
            .find(|pool| pool.id == child.pool_id())
    }

    /// IDs of the direct children, in adoption order
    pub fn children(&self) -> impl Iterator<Item = ChildId> + '_ {
        self.children.iter().map(|pool| ChildId::of(pool.id))
    }

    /// Destroys one child ahead of this pool
    pub fn destroy_child(&mut self, child: ChildId) -> MemoryResult<TeardownReport> {
        let index = self.child_index(child)?;
        Ok(self.children.remove(index).destroy())
    }

    /// Gives up ownership of a child without destroying it
    pub fn detach_child(&mut self, child: ChildId) -> MemoryResult<Self> {
        let index = self.child_index(child)?;

        #[cfg(feature = "logging")]
        debug!(pool = %self.id, child = %child, "detached child pool");

        Ok(self.children.remove(index))
    }

    /// Tears the pool down: children depth-first in adoption order, then
    /// this pool's destructors newest first, then its bins
    pub fn destroy(mut self) -> TeardownReport {
        self.teardown()
    }

    /// Tears the pool down like [`destroy`](Self::destroy) but keeps it usable
    ///
    /// The pool keeps its identity and configuration. Markers that were open
    /// can no longer be ended.
    pub fn clear(&mut self) -> TeardownReport {
        self.teardown()
    }

    fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        for child in core::mem::take(&mut self.children) {
            report += child.destroy();
        }

        let open_markers = self.markers.invalidate_all();
        #[cfg(feature = "logging")]
        if open_markers > 0 {
            warn!(
                pool = %self.id,
                open_markers,
                "tearing down pool with open temporary markers"
            );
        }
        #[cfg(not(feature = "logging"))]
        let _ = open_markers;

        report.destructors_fired += self.destructors.fire_all(&self.bins);
        let released = self.bins.clear();
        report.bins_freed += released.bins;
        report.bytes_freed += released.bytes;
        report.pools_destroyed += 1;
        self.live_allocations = 0;

        #[cfg(feature = "logging")]
        debug!(
            pool = %self.id,
            pools = report.pools_destroyed,
            destructors = report.destructors_fired,
            bins = report.bins_freed,
            bytes = report.bytes_freed,
            "pool torn down"
        );

        report
    }

    fn is_pristine(&self) -> bool {
        self.bins.is_empty()
            && self.destructors.is_empty()
            && self.children.is_empty()
            && self.markers.len() == 0
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    /// Identity of the pool
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Active configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of bins
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Sum of bin capacities in bytes
    pub fn capacity(&self) -> usize {
        self.bins.capacity()
    }

    /// Sum of bin cursors in bytes
    pub fn used(&self) -> usize {
        self.bins.used()
    }

    /// Allocations made and not yet rolled back
    pub fn live_allocations(&self) -> usize {
        self.live_allocations
    }

    /// Destructors registered and not yet fired
    pub fn pending_destructors(&self) -> usize {
        self.destructors.len()
    }

    /// Occupancy of each bin, oldest first
    pub fn bins(&self) -> impl Iterator<Item = BinStats> + '_ {
        self.bins.iter().map(|bin| BinStats {
            capacity: bin.capacity(),
            used: bin.used(),
        })
    }

    /// Snapshot of this pool alone
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pools: 1,
            bins: self.bins.len(),
            capacity: self.bins.capacity(),
            used: self.bins.used(),
            live_allocations: self.live_allocations,
            pending_destructors: self.destructors.len(),
            open_markers: self.markers.len(),
            children: self.children.len(),
        }
    }

    /// Snapshot of this pool and all its descendants
    pub fn hierarchy_stats(&self) -> PoolStats {
        self.children
            .iter()
            .fold(self.stats(), |total, child| total + child.hierarchy_stats())
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if !self.is_pristine() {
            self.teardown();
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("bins", &self.bins.len())
            .field("used", &self.bins.used())
            .field("live_allocations", &self.live_allocations)
            .field("pending_destructors", &self.destructors.len())
            .field("open_markers", &self.markers.len())
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}
