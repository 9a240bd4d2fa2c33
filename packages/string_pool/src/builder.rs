use std::num::NonZero;

use crate::StringPool;

/// Initial allocation of a freshly built buffer, in bytes.
pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Default ceiling above which a returned buffer is dropped instead of
/// retained, in bytes.
pub(crate) const DEFAULT_MAX_RETAINED_CAPACITY: usize = 4096;

/// Builder for creating a [`StringPool`].
///
/// You only need the builder to customize the pool configuration. The
/// defaults used by [`StringPool::new()`] are sufficient for most use cases.
///
/// # Examples
///
/// ```rust
/// use string_pool::StringPool;
///
/// let pool = StringPool::builder()
///     .initial_capacity(64)
///     .max_retained_capacity(1024)
///     .build();
///
/// assert_eq!(pool.max_retained_capacity(), 1024);
/// ```
#[derive(Debug)]
#[must_use]
pub struct StringPoolBuilder {
    initial_capacity: usize,
    max_retained_capacity: usize,
    slot_capacity: Option<NonZero<usize>>,
}

impl StringPoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
            slot_capacity: None,
        }
    }

    /// Sets the initial allocation of freshly built buffers, in bytes.
    ///
    /// Default is 256.
    pub fn initial_capacity(mut self, bytes: usize) -> Self {
        self.initial_capacity = bytes;
        self
    }

    /// Sets the capacity ceiling for retention, in bytes.
    ///
    /// A buffer whose allocation has grown beyond this is dropped when
    /// returned, so one pathological string operation cannot permanently
    /// inflate the pool's steady-state memory footprint. Default is 4096.
    pub fn max_retained_capacity(mut self, bytes: usize) -> Self {
        self.max_retained_capacity = bytes;
        self
    }

    /// Sets the number of buffers the pool retains at most.
    ///
    /// Defaults to a hardware-parallelism-derived count; see
    /// [`SlotPool::new()`][slot_pool::SlotPool::new].
    pub fn slot_capacity(mut self, slots: NonZero<usize>) -> Self {
        self.slot_capacity = Some(slots);
        self
    }

    /// Builds the string pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> StringPool {
        StringPool::new_inner(
            self.initial_capacity,
            self.max_retained_capacity,
            self.slot_capacity,
        )
    }
}
