//! A bounded, concurrency-safe object-recycling pool.
//!
//! This crate provides [`SlotPool`], a fixed-capacity pool of reusable
//! instances of one type, plus [`LeakTrackingPool`], a decorator that
//! reports instances which are never handed back.
//!
//! # Key characteristics
//!
//! - **Lock-free**: claiming and parking an instance is a single atomic
//!   operation per probed slot; no operation ever blocks, spins, or queues.
//! - **Bounded retained memory**: the pool never retains more instances
//!   than its capacity. Under saturation, released instances are dropped.
//! - **Race tolerant by design**: two racing releases may contend for one
//!   slot, in which case one instance is dropped rather than retained. This
//!   trades hit rate for a cheaper uncontended path and is part of the
//!   contract, not a defect.
//! - **Factory fallback**: when no retained instance is available, a
//!   caller-supplied factory builds a fresh one; factory panics propagate.
//!
//! # Two ways to rent
//!
//! The by-value surface transfers ownership outright and relies on the
//! caller to hand the instance back:
//!
//! ```rust
//! use slot_pool::SlotPool;
//!
//! let pool = SlotPool::new(|| Vec::<u8>::with_capacity(512));
//!
//! let mut buffer = pool.rent();
//! buffer.extend_from_slice(b"chunk");
//! buffer.clear();
//!
//! let retained = pool.release(buffer);
//! assert!(retained);
//! ```
//!
//! The scoped surface returns a guard that performs the hand-back in its
//! destructor, so a forgotten return is impossible:
//!
//! ```rust
//! use slot_pool::SlotPool;
//!
//! let pool = SlotPool::new(String::new);
//!
//! let mut text = pool.rent_scoped();
//! text.push_str("scratch");
//! // Dropping `text` returns the instance to the pool.
//! ```
//!
//! # Leak tracking
//!
//! For the by-value surface, [`LeakTrackingPool`] adds best-effort
//! diagnostics: every rent is associated with a record capturing the call
//! site, and an instance dropped without being released is reported once
//! through `tracing`:
//!
//! ```rust
//! use slot_pool::{LeakTrackingPool, SlotPool};
//!
//! let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));
//!
//! let text = pool.rent();
//! drop(text); // Never released: reported as a leak.
//!
//! assert_eq!(pool.detected_leaks(), 1);
//! ```

mod leak;
mod pool;
mod rented;

pub use leak::{LeakTrackingPool, Tracked};
pub use pool::SlotPool;
pub use rented::Rented;
