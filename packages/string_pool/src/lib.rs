//! Pooled string buffers with a capacity-based retention policy.
//!
//! Building strings piece by piece allocates; doing it in a hot path
//! allocates every time. This crate keeps a bounded pool of `String`
//! buffers so that the allocation from one use is carried into the next:
//! rent a [`PooledString`], format into it, and take the result with
//! [`finish()`][PooledString::finish] — the buffer goes back to the pool
//! cleared, its allocation intact.
//!
//! Buffers that ballooned during use are not retained: anything grown past
//! the pool's retention ceiling is dropped on return, so a single
//! pathological operation cannot permanently inflate the pool's footprint.
//!
//! The pooling itself is provided by the `slot_pool` package; this crate
//! layers the buffer-specific policy and ergonomics on top.
//!
//! # Examples
//!
//! Using the process-wide default pool:
//!
//! ```rust
//! use std::fmt::Write;
//!
//! use string_pool::StringPool;
//!
//! let mut text = StringPool::global().rent_with("users/");
//! write!(text, "{}", 42)?;
//!
//! assert_eq!(text.finish(), "users/42");
//! # Ok::<(), std::fmt::Error>(())
//! ```
//!
//! Using a dedicated pool with custom limits:
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use string_pool::StringPool;
//!
//! let pool = StringPool::builder()
//!     .initial_capacity(64)
//!     .max_retained_capacity(1024)
//!     .slot_capacity(NonZero::new(4).unwrap())
//!     .build();
//!
//! let mut line = pool.rent();
//! line.push_str("field1,field2");
//!
//! assert_eq!(pool.rent_with("x").finish(), "x");
//! # drop(line);
//! ```

mod builder;
mod pool;
mod pooled;

pub use builder::StringPoolBuilder;
pub use pool::StringPool;
pub use pooled::PooledString;
