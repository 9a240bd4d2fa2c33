//! Example demonstrating basic usage of `StringPool`.
//!
//! Shows seeded renting, formatting into a pooled buffer, the combined
//! extract-and-return step, and the retention policy for oversized buffers.

use std::fmt::Write;

use string_pool::StringPool;

fn main() {
    println!("=== StringPool: Recycled String Buffers ===");

    let pool = StringPool::builder()
        .initial_capacity(64)
        .max_retained_capacity(1024)
        .build();

    // Rent, format, and take the result in one flow; the buffer returns to
    // the pool as part of `finish()`.
    let mut line = pool.rent_with("event=");
    write!(line, "{}, attempt {}", "login", 3).expect("writing into a string cannot fail");
    let line = line.finish();
    println!("Formatted: {line}");

    // The next rent reuses the same allocation.
    let reused = pool.rent();
    println!("Reused buffer capacity: {}", reused.capacity());
    drop(reused);

    // Substring extraction also returns the buffer.
    let path = pool.rent_with("users/1234/profile");
    let segment = path.finish_range(6..10);
    println!("Extracted segment: {segment}");

    // A buffer that balloons past the retention ceiling is dropped rather
    // than kept alive in the pool.
    let mut report = pool.rent();
    report.push_str(&"long line\n".repeat(500));
    let retained = report.release();
    println!("Oversized buffer retained: {retained}");

    // The process-wide pool needs no setup at all.
    let greeting = StringPool::global().rent_with("hello, pool").finish();
    println!("From the global pool: {greeting}");
}
