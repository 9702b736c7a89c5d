//! Bin chain backing the bump allocator
//!
//! A bin is one fixed-capacity chunk of owned storage with a bump cursor.
//! The chain keeps bins in creation order; the last element is the newest bin
//! and the only one allocations are carved from. A bin that cannot fit a
//! request is left behind with its unused tail and a new bin is pushed.
//!
//! ## Invariants
//!
//! - `used <= capacity` for every bin
//! - A new bin has capacity `max(requested, min_bin_size)`
//! - Bin serials are never reused within a chain, so a handle into a
//!   discarded bin can never resolve against a later bin at the same index
//! - Allocation sequence numbers only grow. Every rollback inside a surviving
//!   bin records a cut `(sequence, offset)`, and a handle resolves only if no
//!   cut made after it was issued lies at or below its offset

use std::alloc::{Layout, handle_alloc_error};

#[cfg(feature = "logging")]
use tracing::{debug, error};

use super::PoolId;

/// Handle to a block of bytes carved out of a [`Pool`](super::Pool)
///
/// Handles are plain values: they do not borrow the pool and stay `Copy`.
/// Resolve them through [`Pool::get`](super::Pool::get) and friends, which
/// return `None` once the backing memory has been rolled back or freed, even
/// after the same bytes were handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Allocation {
    pool: PoolId,
    bin_index: usize,
    bin_serial: u64,
    sequence: u64,
    offset: usize,
    len: usize,
}

impl Allocation {
    /// Pool this allocation was carved from
    #[must_use]
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// Size of the allocation in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: zero-sized requests never produce a handle
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the bin holding this allocation, oldest bin first
    #[must_use]
    pub fn bin_index(&self) -> usize {
        self.bin_index
    }

    /// Byte offset of the allocation inside its bin
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Rollback point inside a surviving bin
///
/// Allocations issued before `sequence` at or above `offset` are gone.
#[derive(Debug, Clone, Copy)]
struct Cut {
    sequence: u64,
    offset: usize,
}

/// One chunk of raw storage
pub(crate) struct Bin {
    serial: u64,
    data: Box<[u8]>,
    used: usize,
    // Ascending in both sequence and offset
    cuts: Vec<Cut>,
}

impl Bin {
    fn new(serial: u64, capacity: usize) -> Self {
        Self {
            serial,
            data: obtain_storage(capacity),
            used: 0,
            cuts: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.capacity() - self.used
    }

    /// Advances the cursor by `size` bytes and returns the start offset
    fn bump(&mut self, size: usize, zeroed: bool) -> Option<usize> {
        if size > self.remaining() {
            return None;
        }

        let offset = self.used;
        self.used += size;

        if zeroed {
            self.data[offset..self.used].fill(0);
        }

        Some(offset)
    }

    /// Moves the cursor back to `used`, optionally poisoning the released tail
    ///
    /// `sequence` is the next allocation sequence of the chain; every handle
    /// in the released tail was issued before it.
    fn truncate(&mut self, used: usize, pattern: Option<u8>, sequence: u64) -> usize {
        debug_assert!(used <= self.used, "bin cursor can only move backwards");

        let released = self.used - used;
        if released == 0 {
            return 0;
        }

        if let Some(byte) = pattern {
            self.data[used..self.used].fill(byte);
        }
        self.used = used;

        // A deeper cut made later covers every query the shallower ones did.
        while self.cuts.last().is_some_and(|cut| cut.offset >= used) {
            self.cuts.pop();
        }
        self.cuts.push(Cut {
            sequence,
            offset: used,
        });

        released
    }

    /// Whether an allocation issued at `sequence` starting at `offset`
    /// survived every rollback since
    fn survived(&self, sequence: u64, offset: usize) -> bool {
        let first_later = self.cuts.partition_point(|cut| cut.sequence <= sequence);
        self.cuts
            .get(first_later)
            .is_none_or(|cut| offset < cut.offset)
    }
}

/// Obtains zero-initialized backing storage for a bin
///
/// Failure is fatal: the error is logged and the process aborts through
/// [`handle_alloc_error`], since callers of the pool assume allocation
/// always succeeds.
fn obtain_storage(capacity: usize) -> Box<[u8]> {
    let mut data = Vec::new();

    if data.try_reserve_exact(capacity).is_err() {
        #[cfg(feature = "logging")]
        error!(capacity, "failed to obtain backing storage for a new bin");

        match Layout::array::<u8>(capacity) {
            Ok(layout) => handle_alloc_error(layout),
            Err(_) => panic!("bin capacity {capacity} exceeds the address space"),
        }
    }

    data.resize(capacity, 0);
    data.into_boxed_slice()
}

/// Result of a bump allocation
#[derive(Debug, Clone, Copy)]
pub(crate) struct BinSlot {
    pub(crate) bin_index: usize,
    pub(crate) bin_serial: u64,
    pub(crate) sequence: u64,
    pub(crate) offset: usize,
}

/// Snapshot of the chain position used by temporary-memory markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChainPosition {
    /// Number of bins alive when the snapshot was taken
    pub(crate) bin_count: usize,
    /// Cursor of the newest bin at snapshot time (0 when there were no bins)
    pub(crate) newest_used: usize,
}

/// What a rollback or teardown gave back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Released {
    pub(crate) bins: usize,
    pub(crate) bytes: usize,
}

/// Ordered stack of bins, oldest first
#[derive(Default)]
pub(crate) struct BinChain {
    bins: Vec<Bin>,
    next_serial: u64,
    next_sequence: u64,
}

impl BinChain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Carves `size` bytes out of the newest bin, creating a bin if needed
    ///
    /// `size` must be non-zero; the pool filters zero-sized requests before
    /// they reach the chain.
    pub(crate) fn bump(
        &mut self,
        pool: PoolId,
        size: usize,
        zeroed: bool,
        min_bin_size: usize,
    ) -> BinSlot {
        debug_assert!(size > 0, "zero-sized requests never reach the bin chain");

        if let Some(slot) = self.bump_newest(size, zeroed) {
            return slot;
        }

        let capacity = size.max(min_bin_size);
        let serial = self.next_serial;
        self.next_serial += 1;
        self.bins.push(Bin::new(serial, capacity));

        #[cfg(feature = "logging")]
        debug!(
            %pool,
            bin = self.bins.len() - 1,
            capacity,
            requested = size,
            "created bin"
        );
        #[cfg(not(feature = "logging"))]
        let _ = pool;

        self.bump_newest(size, zeroed)
            .unwrap_or_else(|| unreachable!("fresh bin of {capacity} bytes cannot fit {size}"))
    }

    fn bump_newest(&mut self, size: usize, zeroed: bool) -> Option<BinSlot> {
        let bin_index = self.bins.len().checked_sub(1)?;
        let bin = &mut self.bins[bin_index];
        let offset = bin.bump(size, zeroed)?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Some(BinSlot {
            bin_index,
            bin_serial: bin.serial,
            sequence,
            offset,
        })
    }

    pub(crate) fn handle(pool: PoolId, slot: BinSlot, len: usize) -> Allocation {
        Allocation {
            pool,
            bin_index: slot.bin_index,
            bin_serial: slot.bin_serial,
            sequence: slot.sequence,
            offset: slot.offset,
            len,
        }
    }

    /// Current position, for a temporary-memory marker
    pub(crate) fn position(&self) -> ChainPosition {
        ChainPosition {
            bin_count: self.bins.len(),
            newest_used: self.bins.last().map_or(0, Bin::used),
        }
    }

    /// Discards every bin created after `position` and restores the cursor of
    /// the bin that was newest at that time
    pub(crate) fn rollback(&mut self, position: ChainPosition, pattern: Option<u8>) -> Released {
        let mut released = Released::default();

        while self.bins.len() > position.bin_count {
            if let Some(bin) = self.bins.pop() {
                released.bins += 1;
                released.bytes += bin.used();
            }
        }

        if let Some(newest) = self.bins.last_mut() {
            released.bytes += newest.truncate(position.newest_used, pattern, self.next_sequence);
        }

        released
    }

    /// Frees every bin
    pub(crate) fn clear(&mut self) -> Released {
        let released = Released {
            bins: self.bins.len(),
            bytes: self.used(),
        };
        self.bins.clear();
        released
    }

    fn resolve(&self, allocation: &Allocation) -> Option<&Bin> {
        let bin = self.bins.get(allocation.bin_index)?;
        let end = allocation.offset.checked_add(allocation.len)?;
        (bin.serial == allocation.bin_serial
            && end <= bin.used()
            && bin.survived(allocation.sequence, allocation.offset))
            .then_some(bin)
    }

    /// Bytes behind a handle, if they are still live
    pub(crate) fn bytes(&self, allocation: &Allocation) -> Option<&[u8]> {
        let bin = self.resolve(allocation)?;
        bin.data
            .get(allocation.offset..allocation.offset + allocation.len)
    }

    /// Mutable bytes behind a handle, if they are still live
    pub(crate) fn bytes_mut(&mut self, allocation: &Allocation) -> Option<&mut [u8]> {
        self.resolve(allocation)?;
        let bin = self.bins.get_mut(allocation.bin_index)?;
        bin.data
            .get_mut(allocation.offset..allocation.offset + allocation.len)
    }

    pub(crate) fn is_live(&self, allocation: &Allocation) -> bool {
        self.resolve(allocation).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.bins.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.bins.iter().map(Bin::capacity).sum()
    }

    pub(crate) fn used(&self) -> usize {
        self.bins.iter().map(Bin::used).sum()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Bin> {
        self.bins.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_id() -> PoolId {
        PoolId::from_raw(42)
    }

    #[test]
    fn test_first_bump_creates_bin() {
        let mut chain = BinChain::new();
        assert!(chain.is_empty());

        let slot = chain.bump(pool_id(), 16, false, 64);
        assert_eq!(slot.bin_index, 0);
        assert_eq!(slot.offset, 0);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.capacity(), 64);
        assert_eq!(chain.used(), 16);
    }

    #[test]
    fn test_bump_reuses_newest_bin() {
        let mut chain = BinChain::new();
        chain.bump(pool_id(), 16, false, 64);
        let slot = chain.bump(pool_id(), 32, false, 64);

        assert_eq!(slot.bin_index, 0);
        assert_eq!(slot.offset, 16);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_oversized_request_gets_exact_bin() {
        let mut chain = BinChain::new();
        chain.bump(pool_id(), 8, false, 64);
        let slot = chain.bump(pool_id(), 1000, false, 64);

        assert_eq!(slot.bin_index, 1);
        assert_eq!(slot.offset, 0);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.capacity(), 64 + 1000);
    }

    #[test]
    fn test_exhausted_bin_is_left_behind() {
        let mut chain = BinChain::new();
        chain.bump(pool_id(), 60, false, 64);
        let slot = chain.bump(pool_id(), 8, false, 64);

        // The 4 spare bytes in bin 0 are never revisited.
        assert_eq!(slot.bin_index, 1);
        assert_eq!(chain.used(), 68);
    }

    #[test]
    fn test_zeroed_bump_clears_stale_bytes() {
        let mut chain = BinChain::new();
        chain.bump(pool_id(), 8, false, 64);
        let position = chain.position();
        let slot = chain.bump(pool_id(), 8, false, 64);
        let handle = BinChain::handle(pool_id(), slot, 8);
        chain.bytes_mut(&handle).unwrap().fill(0xFF);

        chain.rollback(position, None);
        let slot = chain.bump(pool_id(), 8, false, 64);
        let handle = BinChain::handle(pool_id(), slot, 8);
        assert_eq!(chain.bytes(&handle).unwrap(), &[0xFF; 8]);

        chain.rollback(position, None);
        let slot = chain.bump(pool_id(), 8, true, 64);
        let handle = BinChain::handle(pool_id(), slot, 8);
        assert_eq!(chain.bytes(&handle).unwrap(), &[0; 8]);
    }

    #[test]
    fn test_rollback_to_pristine() {
        let mut chain = BinChain::new();
        let position = chain.position();
        chain.bump(pool_id(), 100, false, 64);
        chain.bump(pool_id(), 100, false, 64);

        let released = chain.rollback(position, None);
        assert_eq!(released.bins, 2);
        assert_eq!(released.bytes, 200);
        assert!(chain.is_empty());
        assert_eq!(chain.capacity(), 0);
    }

    #[test]
    fn test_rollback_restores_cursor_and_poisons() {
        let mut chain = BinChain::new();
        chain.bump(pool_id(), 10, true, 64);
        let position = chain.position();
        let slot = chain.bump(pool_id(), 10, true, 64);
        let stale = BinChain::handle(pool_id(), slot, 10);

        let released = chain.rollback(position, Some(0xDD));
        assert_eq!(released.bins, 0);
        assert_eq!(released.bytes, 10);
        assert_eq!(chain.used(), 10);
        assert!(!chain.is_live(&stale));

        // The poisoned bytes become visible to the next unzeroed bump.
        let slot = chain.bump(pool_id(), 10, false, 64);
        let handle = BinChain::handle(pool_id(), slot, 10);
        assert_eq!(chain.bytes(&handle).unwrap(), &[0xDD; 10]);
    }

    #[test]
    fn test_discarded_bin_handle_does_not_resolve_in_new_bin() {
        let mut chain = BinChain::new();
        let position = chain.position();
        let slot = chain.bump(pool_id(), 16, false, 64);
        let stale = BinChain::handle(pool_id(), slot, 16);

        chain.rollback(position, None);
        chain.bump(pool_id(), 32, false, 64);

        assert!(chain.bytes(&stale).is_none());
    }

    #[test]
    fn test_rolled_back_handle_does_not_alias_reused_bytes() {
        let mut chain = BinChain::new();
        chain.bump(pool_id(), 8, false, 64);
        let kept = BinChain::handle(pool_id(), chain.bump(pool_id(), 8, false, 64), 8);

        let position = chain.position();
        let slot = chain.bump(pool_id(), 6, false, 64);
        let stale = BinChain::handle(pool_id(), slot, 6);
        chain.bytes_mut(&stale).unwrap().copy_from_slice(b"secret");
        chain.rollback(position, None);

        let slot = chain.bump(pool_id(), 6, false, 64);
        let fresh = BinChain::handle(pool_id(), slot, 6);
        chain.bytes_mut(&fresh).unwrap().copy_from_slice(b"public");

        assert_eq!(stale.offset(), fresh.offset());
        assert!(chain.bytes(&stale).is_none());
        assert!(!chain.is_live(&stale));
        assert_eq!(chain.bytes(&fresh).unwrap(), b"public");
        assert!(chain.is_live(&kept));
    }

    #[test]
    fn test_nested_rollbacks_keep_older_handles() {
        let mut chain = BinChain::new();
        let a = BinChain::handle(pool_id(), chain.bump(pool_id(), 8, false, 64), 8);
        let outer = chain.position();
        let b = BinChain::handle(pool_id(), chain.bump(pool_id(), 8, false, 64), 8);
        let inner = chain.position();
        let c = BinChain::handle(pool_id(), chain.bump(pool_id(), 8, false, 64), 8);

        chain.rollback(inner, None);
        let d = BinChain::handle(pool_id(), chain.bump(pool_id(), 8, false, 64), 8);
        assert!(!chain.is_live(&c));
        assert!(chain.is_live(&b));
        assert!(chain.is_live(&d));

        chain.rollback(outer, None);
        let e = BinChain::handle(pool_id(), chain.bump(pool_id(), 16, false, 64), 16);
        assert!(chain.is_live(&a));
        assert!(!chain.is_live(&b));
        assert!(!chain.is_live(&c));
        assert!(!chain.is_live(&d));
        assert!(chain.is_live(&e));
    }

    #[test]
    fn test_clear_reports_everything() {
        let mut chain = BinChain::new();
        chain.bump(pool_id(), 10, false, 16);
        chain.bump(pool_id(), 10, false, 16);

        let released = chain.clear();
        assert_eq!(released.bins, 2);
        assert_eq!(released.bytes, 20);
        assert!(chain.is_empty());
    }
}
