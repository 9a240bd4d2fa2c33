use std::any::type_name;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use crate::SlotPool;

/// A rented instance that hands itself back to its [`SlotPool`] when dropped.
///
/// Created by [`SlotPool::rent_scoped()`]. The guard dereferences to the
/// rented instance, so it can be used wherever a `&T` or `&mut T` is
/// expected. Because the return happens in the destructor, a forgotten
/// return is not possible with this form of renting.
///
/// Use [`into_inner()`][Self::into_inner] to keep the instance and detach it
/// from the pool instead.
///
/// # Examples
///
/// ```rust
/// use slot_pool::SlotPool;
///
/// let pool = SlotPool::new(|| Vec::<u8>::with_capacity(64));
///
/// let mut scratch = pool.rent_scoped();
/// scratch.push(1);
/// scratch.clear();
/// drop(scratch); // Returned to the pool.
///
/// let reused = pool.rent();
/// assert!(reused.capacity() >= 64);
/// ```
#[must_use = "the instance returns to the pool as soon as this guard is dropped"]
pub struct Rented<'p, T, F>
where
    F: Fn() -> T,
{
    /// Present from construction until the guard is consumed or dropped.
    value: ManuallyDrop<T>,

    pool: &'p SlotPool<T, F>,
}

impl<'p, T, F> Rented<'p, T, F>
where
    F: Fn() -> T,
{
    pub(crate) fn new(pool: &'p SlotPool<T, F>, value: T) -> Self {
        Self {
            value: ManuallyDrop::new(value),
            pool,
        }
    }

    /// Detaches the instance from the pool and returns it to the caller.
    ///
    /// The pool will never see this instance again; it is dropped whenever
    /// the caller drops it.
    #[must_use]
    pub fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);

        // SAFETY: `this` is never dropped, so this is the only take of the
        // value.
        unsafe { ManuallyDrop::take(&mut this.value) }
    }
}

impl<T, F> Deref for Rented<'_, T, F>
where
    F: Fn() -> T,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T, F> DerefMut for Rented<'_, T, F>
where
    F: Fn() -> T,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T, F> fmt::Debug for Rented<'_, T, F>
where
    F: Fn() -> T,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rented")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .finish_non_exhaustive()
    }
}

impl<T, F> Drop for Rented<'_, T, F>
where
    F: Fn() -> T,
{
    fn drop(&mut self) {
        // SAFETY: `into_inner()` forgets the guard, so on this path the value
        // is still present and this is the only take.
        let value = unsafe { ManuallyDrop::take(&mut self.value) };

        // Whether the pool retained the instance is of no concern here.
        self.pool.release(value);
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn box_identity(boxed: &u8) -> *const u8 {
        ptr::from_ref::<u8>(boxed)
    }

    #[test]
    fn drop_returns_instance_to_pool() {
        let pool = SlotPool::new(|| Box::new(0_u8));

        let rented = pool.rent_scoped();
        let address = box_identity(&rented);
        drop(rented);

        let reused = pool.rent();
        assert_eq!(box_identity(&reused), address);
    }

    #[test]
    fn into_inner_detaches_instance() {
        let created = Arc::new(AtomicUsize::new(0));

        let pool = {
            let created = Arc::clone(&created);

            SlotPool::new(move || {
                created.fetch_add(1, Ordering::Relaxed);
                Box::new(0_u8)
            })
        };

        let rented = pool.rent_scoped();
        let address = box_identity(&rented);

        let detached = rented.into_inner();
        assert_eq!(box_identity(&detached), address);
        drop(detached);

        // Nothing was returned to the pool, so the next rent builds again.
        let _fresh = pool.rent();
        assert_eq!(created.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn deref_mut_mutates_rented_instance() {
        let pool = SlotPool::new(String::new);

        let mut rented = pool.rent_scoped();
        rented.push_str("scratch");
        assert_eq!(rented.as_str(), "scratch");
    }
}
