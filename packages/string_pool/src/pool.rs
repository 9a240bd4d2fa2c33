use std::fmt;
use std::num::NonZero;
use std::sync::LazyLock;

use slot_pool::SlotPool;

use crate::{PooledString, StringPoolBuilder};

/// The factory only captures configuration, never the pool itself; the
/// back-reference that lets a buffer return to its pool lives in
/// [`PooledString`].
type BufferFactory = Box<dyn Fn() -> String + Send + Sync>;

/// A pool of reusable string buffers.
///
/// Renting yields a [`PooledString`] that collects text and hands its buffer
/// back to the pool when dropped or explicitly released. Buffers come back
/// cleared, so every rent starts empty, with the previous rent's allocation
/// already in place.
///
/// Retention is capacity-gated: a buffer that has grown beyond
/// [`max_retained_capacity()`][Self::max_retained_capacity] is dropped
/// instead of retained, keeping the pool's steady-state footprint bounded by
/// `slots × max_retained_capacity`.
///
/// A process-wide instance with default configuration is available through
/// [`global()`][Self::global].
///
/// # Examples
///
/// ```rust
/// use std::fmt::Write;
///
/// use string_pool::StringPool;
///
/// let pool = StringPool::new();
///
/// let mut text = pool.rent_with("status=");
/// write!(text, "{}", 200)?;
///
/// assert_eq!(text.finish(), "status=200");
/// # Ok::<(), std::fmt::Error>(())
/// ```
pub struct StringPool {
    pool: SlotPool<String, BufferFactory>,
    initial_capacity: usize,
    max_retained_capacity: usize,
}

impl StringPool {
    /// Creates a pool with the default configuration.
    ///
    /// Defaults: 256-byte initial buffers, 4096-byte retention ceiling, and
    /// a hardware-parallelism-derived slot count.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a pool with custom configuration.
    pub fn builder() -> StringPoolBuilder {
        StringPoolBuilder::new()
    }

    pub(crate) fn new_inner(
        initial_capacity: usize,
        max_retained_capacity: usize,
        slot_capacity: Option<NonZero<usize>>,
    ) -> Self {
        let factory: BufferFactory = Box::new(move || String::with_capacity(initial_capacity));

        let pool = match slot_capacity {
            Some(slots) => SlotPool::with_capacity(factory, slots),
            None => SlotPool::new(factory),
        };

        Self {
            pool,
            initial_capacity,
            max_retained_capacity,
        }
    }

    /// The process-wide pool with default configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use string_pool::StringPool;
    ///
    /// let greeting = StringPool::global().rent_with("hello").finish();
    /// assert_eq!(greeting, "hello");
    /// ```
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: LazyLock<StringPool> = LazyLock::new(StringPool::new);

        &GLOBAL
    }

    /// Rents an empty buffer.
    #[must_use]
    pub fn rent(&self) -> PooledString<'_> {
        let buffer = self.pool.rent();

        debug_assert!(
            buffer.is_empty(),
            "pooled buffers are always cleared before retention"
        );

        PooledString::new(self, buffer)
    }

    /// Rents a buffer seeded with `seed`.
    #[must_use]
    pub fn rent_with(&self, seed: &str) -> PooledString<'_> {
        let mut rented = self.rent();
        rented.push_str(seed);
        rented
    }

    /// Shuts the inner pool down; see [`SlotPool::shutdown()`].
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Initial allocation of freshly built buffers, in bytes.
    #[must_use]
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Capacity ceiling above which returned buffers are dropped, in bytes.
    #[must_use]
    pub fn max_retained_capacity(&self) -> usize {
        self.max_retained_capacity
    }

    /// Applies the retention policy to a buffer coming back from a rent.
    pub(crate) fn release_buffer(&self, mut buffer: String) -> bool {
        if buffer.capacity() > self.max_retained_capacity {
            // Oversized: dropping it keeps the retained footprint bounded.
            return false;
        }

        buffer.clear();
        self.pool.release(buffer)
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringPool")
            .field("initial_capacity", &self.initial_capacity)
            .field("max_retained_capacity", &self.max_retained_capacity)
            .field("slots", &self.pool.capacity())
            .finish_non_exhaustive()
    }
}
