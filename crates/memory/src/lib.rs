//! # mem-pool
//!
//! Hierarchical arena allocator: bump-allocated pools with deferred
//! destructors, temporary-memory rollback and cascading teardown.
//!
//! A [`Pool`] hands out [`Allocation`] handles carved from a chain of bins.
//! Nothing is freed individually. Memory comes back in bulk when a temporary
//! scope ends or when the pool (and every pool adopted under it) is torn down,
//! and registered destructors fire newest first each time.
//!
//! ## Quick Start
//!
//! ```rust
//! use mem_pool::prelude::*;
//!
//! let mut root = Pool::new();
//! let header = root.allocate(64, true).unwrap();
//!
//! // Scratch memory that disappears at the end of the scope
//! {
//!     let mut scratch = root.temporary();
//!     let buffer = scratch.allocate(4096, false).unwrap();
//!     scratch.get_mut(&buffer).unwrap()[0] = 1;
//! }
//!
//! // Children are destroyed before their parent
//! let child = root.new_child();
//! root.child_mut(child)
//!     .unwrap()
//!     .on_teardown(|| println!("child torn down"));
//!
//! assert!(root.get(&header).is_some());
//! let report = root.destroy();
//! assert_eq!(report.pools_destroyed, 2);
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured events through `tracing`
//!
//! ## Architecture
//!
//! - Standalone error handling via [`error`] module
//! - Configuration and sizing constants in [`core`]
//! - Pools, handles, markers and diagnostics in [`pool`]

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]
// #[must_use] on fns returning Self/Result documents intent even if type is already must_use
#![allow(clippy::double_must_use)]

// Error types
pub mod error;

// Core modules
pub mod core;
pub mod macros;
pub mod pool;

// Re-export core types for convenience
pub use crate::core::PoolConfig;
pub use crate::error::{MemoryError, MemoryResult, Result};
pub use crate::pool::{
    Allocation, BinStats, ChildId, DestructorFn, Marker, Pool, PoolId, PoolStats, TeardownReport,
    TemporaryScope,
};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::core::PoolConfig;
    pub use crate::error::{MemoryError, MemoryResult};
    pub use crate::pool::{Allocation, ChildId, Marker, Pool, PoolStats, TeardownReport, TemporaryScope};
}
