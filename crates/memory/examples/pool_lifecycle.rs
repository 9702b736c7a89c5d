//! Walks a pool tree through allocation, temporary memory and teardown.
//!
//! Run with `RUST_LOG=mem_pool=trace` to see every event.

use mem_pool::{MemoryResult, Pool, PoolConfig};

fn main() -> MemoryResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mem_pool=debug")),
        )
        .init();

    let mut root = Pool::with_config(PoolConfig::debug().with_name("root"))?;
    let title = root.allocate_str("pool lifecycle");
    root.on_teardown(|| println!("root teardown hook"));

    // Scratch work that is rolled back as a unit
    let sum = root.with_temporary(|pool| {
        let mut total = 0u64;
        for value in 1..=16u8 {
            if let Some(cell) = pool.allocate_copy(&[value]) {
                total += u64::from(pool.get(&cell).map_or(0, |bytes| bytes[0]));
            }
        }
        println!("scratch: {}", pool.stats());
        total
    })?;
    println!("scratch sum = {sum}, used after rollback = {} bytes", root.used());

    // A child pool holding per-request data
    let request = root.new_child();
    if let Some(pool) = root.child_mut(request) {
        let body = pool.allocate_with_destructor(256, true, |bytes| {
            println!("request body released ({} bytes)", bytes.len());
        });
        println!("request body allocated: {}", body.is_some());
    }

    println!("{}", root.hierarchy_stats());
    let title = title.and_then(|handle| root.get_str(&handle));
    println!("title: {}", title.unwrap_or("<gone>"));

    let report = root.destroy();
    println!(
        "destroyed {} pools, fired {} destructors, freed {} bins ({} bytes)",
        report.pools_destroyed, report.destructors_fired, report.bins_freed, report.bytes_freed
    );

    Ok(())
}
