//! Common types and constants for pool sizing

/// Memory size constants
pub mod size {
    /// 1 Kilobyte
    pub const KB: usize = 1024;

    /// 1 Megabyte
    pub const MB: usize = 1024 * KB;

    /// 1 Gigabyte
    pub const GB: usize = 1024 * MB;
}

/// Bin sizing defaults
pub mod bin {
    use super::size::{GB, KB, MB};

    /// Default minimum capacity of a freshly created bin
    pub const DEFAULT_MIN_BIN_SIZE: usize = 4 * KB;

    /// Minimum bin capacity used by the small preset
    pub const SMALL_MIN_BIN_SIZE: usize = 512;

    /// Minimum bin capacity used by the large preset
    pub const LARGE_MIN_BIN_SIZE: usize = MB;

    /// Upper bound accepted for `min_bin_size`
    pub const MAX_MIN_BIN_SIZE: usize = GB;
}

/// Debug fill patterns
pub mod pattern {
    /// Byte written over memory released by a temporary-memory rollback
    pub const RELEASED: u8 = 0xDD;
}
