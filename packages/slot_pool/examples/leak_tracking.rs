//! Example demonstrating `LeakTrackingPool` diagnostics.
//!
//! A rented instance that is dropped without being released is reported
//! through `tracing`. Run with `RUST_BACKTRACE=1` in a debug build to see
//! the rent-time call site in the report.

use slot_pool::{LeakTrackingPool, SlotPool};

fn main() {
    tracing_subscriber::fmt().init();

    let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));

    // The well-behaved path: rent, use, release.
    let mut text = pool.rent();
    text.push_str("properly returned");
    pool.release(text);
    println!("Leaks after formal release: {}", pool.detected_leaks());

    // The buggy path: the instance is dropped without a release and the
    // pool reports it.
    let forgotten = pool.rent();
    drop(forgotten);
    println!("Leaks after forgotten release: {}", pool.detected_leaks());
}
