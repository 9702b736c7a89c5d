//! Deferred destructor registry
//!
//! Entries are appended in registration order and fired strictly in reverse,
//! each exactly once. A scope (temporary marker or the pool itself) fires
//! every entry registered after it began and leaves older entries alone.
//!
//! Callbacks run while the bins are still intact so they can read the bytes
//! of their allocation; the memory is reclaimed right after.

use core::fmt;

#[cfg(feature = "logging")]
use tracing::trace;

use super::bin::{Allocation, BinChain};

/// Boxed teardown hook. Receives the bytes of its allocation (empty for hooks
/// that are not tied to an allocation).
pub type DestructorFn = Box<dyn FnOnce(&[u8])>;

struct DestructorEntry {
    target: Option<Allocation>,
    callback: DestructorFn,
}

impl fmt::Debug for DestructorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestructorEntry")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Append-only (between scope closes) list of pending destructors
#[derive(Debug, Default)]
pub(crate) struct DestructorRegistry {
    entries: Vec<DestructorEntry>,
}

impl DestructorRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, target: Option<Allocation>, callback: DestructorFn) {
        self.entries.push(DestructorEntry { target, callback });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fires and removes every entry at index `start` or later, newest first
    ///
    /// Returns the number of callbacks invoked.
    pub(crate) fn fire_from(&mut self, start: usize, bins: &BinChain) -> usize {
        let mut fired = 0;

        while self.entries.len() > start {
            let Some(entry) = self.entries.pop() else {
                break;
            };

            let bytes = entry
                .target
                .as_ref()
                .and_then(|target| bins.bytes(target))
                .unwrap_or(&[]);

            #[cfg(feature = "logging")]
            trace!(
                index = self.entries.len(),
                len = bytes.len(),
                "firing destructor"
            );

            (entry.callback)(bytes);
            fired += 1;
        }

        fired
    }

    /// Fires every entry, newest first
    pub(crate) fn fire_all(&mut self, bins: &BinChain) -> usize {
        self.fire_from(0, bins)
    }
}
