//! Standalone error types for mem-pool
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Only contract violations that cannot be ruled out by the type system show
//! up here. Running out of backing storage for a bin is fatal and aborts the
//! process instead of producing an error value.

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::warn;

use crate::pool::{ChildId, PoolId};

// ============================================================================
// Main Error Types
// ============================================================================

/// Pool misuse and configuration errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Temporary Memory Errors ---
    #[error("temporary marker ended out of order: innermost open marker is #{expected}, got #{found}")]
    MarkerOutOfOrder { expected: u64, found: u64 },

    #[error("marker taken on pool {marker_pool} cannot be ended on pool {pool}")]
    ForeignMarker { marker_pool: PoolId, pool: PoolId },

    #[error("marker #{marker} is no longer open on this pool")]
    MarkerInvalidated { marker: u64 },

    // --- Hierarchy Errors ---
    #[error("pool has no child {child}")]
    ChildNotFound { child: ChildId },

    // --- Allocation Errors ---
    #[error("allocation belongs to pool {allocation_pool}, not pool {pool}")]
    ForeignAllocation {
        allocation_pool: PoolId,
        pool: PoolId,
    },

    #[error("allocation is no longer live in pool {pool}")]
    StaleAllocation { pool: PoolId },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl MemoryError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MarkerOutOfOrder { .. } => "MEM:MARKER:ORDER",
            Self::ForeignMarker { .. } => "MEM:MARKER:FOREIGN",
            Self::MarkerInvalidated { .. } => "MEM:MARKER:INVALID",
            Self::ChildNotFound { .. } => "MEM:HIERARCHY:CHILD",
            Self::ForeignAllocation { .. } => "MEM:ALLOC:FOREIGN",
            Self::StaleAllocation { .. } => "MEM:ALLOC:STALE",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
        }
    }

    /// Whether the error reports a broken usage contract rather than bad input
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::MarkerOutOfOrder { .. }
                | Self::ForeignMarker { .. }
                | Self::MarkerInvalidated { .. }
                | Self::ChildNotFound { .. }
                | Self::ForeignAllocation { .. }
                | Self::StaleAllocation { .. }
        )
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create marker out of order error
    pub fn marker_out_of_order(expected: u64, found: u64) -> Self {
        #[cfg(feature = "logging")]
        warn!(expected, found, "temporary marker ended out of LIFO order");

        Self::MarkerOutOfOrder { expected, found }
    }

    /// Create foreign marker error
    pub fn foreign_marker(marker_pool: PoolId, pool: PoolId) -> Self {
        #[cfg(feature = "logging")]
        warn!(%marker_pool, %pool, "temporary marker ended on the wrong pool");

        Self::ForeignMarker { marker_pool, pool }
    }

    /// Create invalidated marker error
    pub fn marker_invalidated(marker: u64) -> Self {
        #[cfg(feature = "logging")]
        warn!(marker, "temporary marker is no longer open");

        Self::MarkerInvalidated { marker }
    }

    /// Create child not found error
    pub fn child_not_found(child: ChildId) -> Self {
        Self::ChildNotFound { child }
    }

    /// Create foreign allocation error
    pub fn foreign_allocation(allocation_pool: PoolId, pool: PoolId) -> Self {
        Self::ForeignAllocation {
            allocation_pool,
            pool,
        }
    }

    /// Create stale allocation error
    pub fn stale_allocation(pool: PoolId) -> Self {
        #[cfg(feature = "logging")]
        warn!(%pool, "allocation handle no longer resolves");

        Self::StaleAllocation { pool }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for pool operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================
