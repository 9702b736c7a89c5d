//! Public macros for mem-pool

/// Build a [`PoolConfig`](crate::PoolConfig) from field overrides and validate it
///
/// Evaluates to `MemoryResult<PoolConfig>`.
///
/// # Examples
/// ```
/// use mem_pool::{Pool, pool_config};
///
/// let config = pool_config! {
///     min_bin_size: 256,
///     zero_by_default: true,
/// }
/// .unwrap();
///
/// let pool = Pool::with_config(config).unwrap();
/// assert_eq!(pool.config().min_bin_size, 256);
/// ```
#[macro_export]
macro_rules! pool_config {
    ($($field:ident: $value:expr),* $(,)?) => {{
        let config = $crate::PoolConfig {
            $($field: $value,)*
            ..Default::default()
        };
        config.validate().map(|()| config)
    }};
}

/// Format a string straight into a pool
///
/// Evaluates to `Option<Allocation>`, `None` when the formatted string is
/// empty.
///
/// # Examples
/// ```
/// use mem_pool::{Pool, pool_str};
///
/// let mut pool = Pool::new();
/// let name = pool_str!(pool, "node-{}", 7).unwrap();
/// assert_eq!(pool.get_str(&name), Some("node-7"));
/// ```
#[macro_export]
macro_rules! pool_str {
    ($pool:expr, $($arg:tt)*) => {{
        let string = ::std::format!($($arg)*);
        $pool.allocate_str(&string)
    }};
}
