//! Example demonstrating basic usage of `SlotPool`.
//!
//! Shows the rent/release cycle, reuse of retained instances, and the
//! bounded behavior under saturation.

use std::num::NonZero;

use slot_pool::SlotPool;

fn main() {
    println!("=== SlotPool: Bounded Instance Recycling ===");

    let pool = SlotPool::with_capacity(
        || Vec::<u8>::with_capacity(1024),
        NonZero::new(2).expect("2 is not zero"),
    );

    // First rent builds via the factory.
    let mut buffer = pool.rent();
    buffer.extend_from_slice(b"first payload");
    println!("Buffer holds {} bytes", buffer.len());

    buffer.clear();
    let retained = pool.release(buffer);
    println!("Buffer retained by the pool: {retained}");

    // The next rent reuses the retained instance, allocation already done.
    let reused = pool.rent();
    println!("Reused buffer capacity: {}", reused.capacity());
    pool.release(reused);

    // A pool at capacity drops further releases instead of growing.
    let a = pool.rent();
    let b = pool.rent();
    let c = pool.rent();
    pool.release(a);
    pool.release(b);
    let retained = pool.release(c);
    println!("Third release retained: {retained}");

    // Shutdown drains every slot; later rents still work via the factory.
    pool.shutdown();
    let fresh = pool.rent();
    println!("Fresh buffer after shutdown, capacity: {}", fresh.capacity());
}
