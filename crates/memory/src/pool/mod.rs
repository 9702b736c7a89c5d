//! Hierarchical bump-allocating pools
//!
//! - [`Pool`] - bin chain, destructor registry, temporary markers and children
//! - [`Allocation`] - `Copy` handle resolved through its pool
//! - [`Marker`] / [`TemporaryScope`] - temporary-memory rollback
//! - [`PoolStats`] / [`BinStats`] - diagnostics

mod bin;
mod destructor;
mod hierarchy;
mod marker;
#[allow(clippy::module_inception)]
mod pool;
mod stats;

pub use bin::Allocation;
pub use destructor::DestructorFn;
pub use hierarchy::{ChildId, PoolId, TeardownReport};
pub use marker::{Marker, TemporaryScope};
pub use pool::Pool;
pub use stats::{BinStats, PoolStats};
