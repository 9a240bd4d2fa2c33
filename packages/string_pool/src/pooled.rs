use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, Range};

use crate::StringPool;

/// A rented string buffer that hands itself back to its [`StringPool`] when
/// dropped.
///
/// The buffer dereferences to `str` and implements [`std::fmt::Write`], so
/// `write!` and `writeln!` format directly into it. Reading the result and
/// returning the buffer collapse into one call with
/// [`finish()`][Self::finish], so the return step cannot be forgotten after
/// the result has been read.
///
/// Whether the buffer is actually retained on return is decided by the
/// pool's retention policy; see [`release()`][Self::release].
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
/// let mut text = pool.rent();
/// write!(text, "{}-{}", "alpha", 7)?;
///
/// assert_eq!(text.finish(), "alpha-7");
/// # Ok::<(), std::fmt::Error>(())
/// ```
#[must_use = "the buffer returns to the pool as soon as this guard is dropped"]
pub struct PooledString<'p> {
    /// Present from construction until the guard is consumed or dropped.
    buffer: ManuallyDrop<String>,

    pool: &'p StringPool,
}

impl<'p> PooledString<'p> {
    pub(crate) fn new(pool: &'p StringPool, buffer: String) -> Self {
        Self {
            buffer: ManuallyDrop::new(buffer),
            pool,
        }
    }

    /// Appends a string slice.
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Appends a single character.
    pub fn push(&mut self, ch: char) {
        self.buffer.push(ch);
    }

    /// Empties the buffer, keeping its allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// The accumulated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Length of the accumulated text, in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer currently holds no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Allocated capacity of the buffer, in bytes.
    ///
    /// This, not the length, is what the pool's retention policy inspects on
    /// return.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Hands the buffer back to the pool, reporting whether it was retained.
    ///
    /// A buffer whose allocation exceeds the pool's
    /// [`max_retained_capacity()`][StringPool::max_retained_capacity] is
    /// dropped instead, as is any buffer returned to a pool that has been
    /// shut down. Dropping the guard applies the same policy without
    /// reporting the outcome.
    pub fn release(self) -> bool {
        let (pool, buffer) = self.into_parts();

        pool.release_buffer(buffer)
    }

    /// Snapshots the accumulated text, hands the buffer back to the pool,
    /// and yields the snapshot.
    ///
    /// When the buffer is oversized it would not be retained anyway, so the
    /// backing allocation itself is handed to the caller instead of a copy.
    #[must_use]
    pub fn finish(self) -> String {
        let (pool, buffer) = self.into_parts();

        if buffer.capacity() > pool.max_retained_capacity() {
            return buffer;
        }

        let snapshot = buffer.as_str().to_owned();
        pool.release_buffer(buffer);

        snapshot
    }

    /// Snapshots a byte range of the accumulated text, hands the buffer back
    /// to the pool, and yields the snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the range does not lie within the buffer on `char`
    /// boundaries.
    #[must_use]
    pub fn finish_range(self, range: Range<usize>) -> String {
        let (pool, buffer) = self.into_parts();

        let snapshot = buffer
            .get(range)
            .expect("range must lie within the buffer and on char boundaries")
            .to_owned();

        pool.release_buffer(buffer);

        snapshot
    }

    /// Splits the guard into its pool reference and buffer without running
    /// the drop-time return.
    fn into_parts(self) -> (&'p StringPool, String) {
        let mut this = ManuallyDrop::new(self);

        // SAFETY: `this` is never dropped, so this is the only take of the
        // buffer.
        let buffer = unsafe { ManuallyDrop::take(&mut this.buffer) };

        (this.pool, buffer)
    }
}

impl Deref for PooledString<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl AsRef<str> for PooledString<'_> {
    fn as_ref(&self) -> &str {
        &self.buffer
    }
}

impl fmt::Write for PooledString<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.buffer.push(c);
        Ok(())
    }
}

impl fmt::Display for PooledString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_str(), f)
    }
}

impl fmt::Debug for PooledString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl Drop for PooledString<'_> {
    fn drop(&mut self) {
        // SAFETY: The consuming methods all forget the guard, so the buffer
        // is still present here and this is the only take.
        let buffer = unsafe { ManuallyDrop::take(&mut self.buffer) };

        self.pool.release_buffer(buffer);
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;

    #[test]
    fn seeded_rent_append_finish_round_trips() {
        let pool = StringPool::new();

        let mut text = pool.rent_with("abc");
        text.push_str("def");

        assert_eq!(text.finish(), "abcdef");

        // The buffer went back cleared and is served again.
        let reused = pool.rent();
        assert!(reused.is_empty());
    }

    #[test]
    fn write_macro_formats_into_buffer() {
        let pool = StringPool::new();

        let mut text = pool.rent();
        write!(text, "{}+{}", 1, 2).expect("writing into a string cannot fail");
        writeln!(text, "=3").expect("writing into a string cannot fail");

        assert_eq!(text.as_str(), "1+2=3\n");
        assert!(text.release());
    }

    #[test]
    fn finish_range_extracts_substring_and_returns_buffer() {
        let pool = StringPool::new();

        let text = pool.rent_with("hello world");
        let address = text.as_str().as_ptr();

        assert_eq!(text.finish_range(6..11), "world");

        // The buffer itself went back to the pool.
        let reused = pool.rent();
        assert_eq!(reused.as_str().as_ptr(), address);
        assert!(reused.is_empty());
    }

    #[test]
    #[should_panic(expected = "range must lie within the buffer")]
    fn finish_range_rejects_out_of_bounds_range() {
        let pool = StringPool::new();

        let text = pool.rent_with("short");
        let _snapshot = text.finish_range(0..99);
    }

    #[test]
    fn finish_hands_over_oversized_allocation_without_copy() {
        let pool = StringPool::builder()
            .initial_capacity(8)
            .max_retained_capacity(16)
            .build();

        let mut text = pool.rent();
        text.push_str(&"y".repeat(64));
        let address = text.as_str().as_ptr();

        let owned = text.finish();

        // Same allocation: no copy was made for a buffer that could not be
        // retained anyway.
        assert_eq!(owned.as_ptr(), address);
        assert_eq!(owned.len(), 64);
    }

    #[test]
    fn drop_applies_retention_policy() {
        let pool = StringPool::builder()
            .initial_capacity(8)
            .max_retained_capacity(64)
            .build();

        let first = pool.rent_with("kept");
        let address = first.as_str().as_ptr();
        drop(first);

        let reused = pool.rent();
        assert_eq!(reused.as_str().as_ptr(), address);
        assert!(reused.is_empty());
    }

    #[test]
    fn display_and_debug_show_contents() {
        let pool = StringPool::new();

        let text = pool.rent_with("visible");

        assert_eq!(format!("{text}"), "visible");
        assert_eq!(format!("{text:?}"), "\"visible\"");

        assert!(text.release());
    }
}
