use std::any::type_name;
use std::fmt;
use std::iter;
use std::num::NonZero;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::thread;

use new_zealand::nz;

use crate::Rented;

/// Multiplier applied to the detected hardware parallelism when no explicit
/// capacity is given.
const SLOTS_PER_PROCESSOR: NonZero<usize> = nz!(4);

/// Capacity used when hardware parallelism cannot be detected.
const FALLBACK_CAPACITY: NonZero<usize> = nz!(4);

/// A bounded pool of reusable instances of `T`, safe to share across threads.
///
/// The pool hands out instances via [`rent()`][1] and takes them back via
/// [`release()`][2]. When no retained instance is available, a caller-supplied
/// factory builds a fresh one; when every slot is occupied, a released
/// instance is dropped instead of retained. The number of instances the pool
/// retains therefore never exceeds its capacity, while rented instances are
/// owned entirely by their holders.
///
/// No pool operation ever blocks or spins. Claiming a retained instance is a
/// single compare-exchange per probed slot, and the worst case for any
/// operation is one linear scan of the slots plus at most one construction.
///
/// # What the pool does not promise
///
/// * No ordering: which retained instance a rent receives is unspecified.
/// * No guaranteed reuse: a released instance may be dropped rather than
///   served to a later rent, both under saturation and when two releases
///   race for the same slot (see [`release()`][2]).
///
/// # Examples
///
/// ```rust
/// use slot_pool::SlotPool;
///
/// let pool = SlotPool::new(|| Vec::<u8>::with_capacity(1024));
///
/// let mut buffer = pool.rent();
/// buffer.extend_from_slice(b"payload");
/// buffer.clear();
///
/// // Hand the instance back; it may be served to the next rent.
/// pool.release(buffer);
///
/// let reused = pool.rent();
/// assert!(reused.capacity() >= 1024);
/// ```
///
/// Scoped usage where the return happens automatically:
///
/// ```rust
/// use slot_pool::SlotPool;
///
/// let pool = SlotPool::new(String::new);
///
/// {
///     let mut text = pool.rent_scoped();
///     text.push_str("transient");
/// } // Returned to the pool here.
/// ```
///
/// [1]: Self::rent
/// [2]: Self::release
pub struct SlotPool<T, F = fn() -> T>
where
    F: Fn() -> T,
{
    /// Total number of slots, fixed at construction.
    capacity: NonZero<usize>,

    /// The slot probed first by both `rent()` and `release()`, optimized for
    /// the common low-contention case. Null means empty; a non-null pointer
    /// is an exclusively owned boxed instance parked in the slot.
    fast_slot: AtomicPtr<T>,

    /// The remaining `capacity - 1` slots, scanned linearly when the fast
    /// slot misses.
    slots: Box<[AtomicPtr<T>]>,

    /// Builds a fresh instance when no retained instance is available.
    factory: F,

    /// Set once by `shutdown()`. Afterwards `rent()` always builds fresh
    /// instances and `release()` never retains.
    shut_down: AtomicBool,
}

// SAFETY: The slots own instances of `T` via the raw pointers they hold, so
// moving the pool to another thread moves those instances with it.
unsafe impl<T, F> Send for SlotPool<T, F>
where
    T: Send,
    F: Fn() -> T + Send,
{
}

// SAFETY: A shared pool only ever moves instances in and out whole, never
// hands out references to parked instances, so `T: Send` is sufficient.
unsafe impl<T, F> Sync for SlotPool<T, F>
where
    T: Send,
    F: Fn() -> T + Sync,
{
}

impl<T, F> SlotPool<T, F>
where
    F: Fn() -> T,
{
    /// Creates a pool with the default capacity, derived from the hardware
    /// parallelism available to the process.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::new(String::new);
    /// assert!(pool.capacity().get() >= 4);
    /// ```
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self::with_capacity(factory, default_capacity())
    }

    /// Creates a pool that retains at most `capacity` instances.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::with_capacity(String::new, NonZero::new(2).unwrap());
    /// assert_eq!(pool.capacity().get(), 2);
    /// ```
    #[must_use]
    pub fn with_capacity(factory: F, capacity: NonZero<usize>) -> Self {
        let scan_slots = capacity.get().saturating_sub(1);

        Self {
            capacity,
            fast_slot: AtomicPtr::new(ptr::null_mut()),
            slots: iter::repeat_with(|| AtomicPtr::new(ptr::null_mut()))
                .take(scan_slots)
                .collect(),
            factory,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Obtains an instance, reusing a retained one when possible.
    ///
    /// Probes the fast slot first, then scans the remaining slots, and falls
    /// back to the factory when nothing can be claimed. Never blocks. If the
    /// factory panics, the panic propagates to the caller and the pool state
    /// is unaffected.
    ///
    /// Ownership of the instance transfers to the caller until it is passed
    /// back via [`release()`][Self::release]; an instance that is never
    /// passed back is simply dropped by its holder.
    #[must_use]
    pub fn rent(&self) -> T {
        // A pool that has been shut down never serves retained instances
        // again. Acquire pairs with the Release store in `shutdown()`.
        if self.shut_down.load(Ordering::Acquire) {
            return (self.factory)();
        }

        if let Some(item) = Self::try_claim(&self.fast_slot) {
            return item;
        }

        for slot in &self.slots {
            if let Some(item) = Self::try_claim(slot) {
                return item;
            }
        }

        (self.factory)()
    }

    /// Obtains an instance wrapped in a guard that returns it to the pool
    /// when dropped.
    ///
    /// See [`Rented`] for detaching the instance instead.
    #[must_use]
    pub fn rent_scoped(&self) -> Rented<'_, T, F> {
        Rented::new(self, self.rent())
    }

    /// Hands an instance back to the pool, reporting whether it was retained.
    ///
    /// Returns `false` when the pool dropped the instance instead: either the
    /// pool has been shut down, or every slot was occupied. A saturated pool
    /// is deliberately lossy so that its retained memory stays bounded.
    ///
    /// Two concurrent releases can both observe the same slot as empty; the
    /// emptiness check is deliberately not synchronized with the write that
    /// follows, keeping the common uncontended path cheap. When that race
    /// occurs, one of the two instances is dropped rather than retained.
    /// Callers are unaffected beyond a lowered hit rate, and no caller can
    /// observe the difference through the returned instance itself. Do not
    /// "fix" this by making the check and write one atomic unit; the race is
    /// part of the performance contract.
    pub fn release(&self, item: T) -> bool {
        // Acquire pairs with the Release store in `shutdown()`.
        if self.shut_down.load(Ordering::Acquire) {
            drop(item);
            return false;
        }

        let parked = Box::into_raw(Box::new(item));

        let mut parked_in = None;

        if Self::try_park(&self.fast_slot, parked) {
            parked_in = Some(&self.fast_slot);
        } else {
            for slot in &self.slots {
                if Self::try_park(slot, parked) {
                    parked_in = Some(slot);
                    break;
                }
            }
        }

        let Some(slot) = parked_in else {
            // Saturated: every slot looked occupied.
            // SAFETY: No slot accepted the pointer, so we still own it.
            drop(unsafe { Box::from_raw(parked) });
            return false;
        };

        // `shutdown()` may have drained the slots between the check at the
        // top and the park. Reclaim the instance if it is still ours so that
        // it cannot survive past disposal; a failed exchange means a rent
        // claimed it before the shutdown drain got there, which is fine.
        if self.shut_down.load(Ordering::Acquire)
            && slot
                .compare_exchange(parked, ptr::null_mut(), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            // SAFETY: The exchange took the pointer back out of the slot.
            drop(unsafe { Box::from_raw(parked) });
            return false;
        }

        true
    }

    /// Shuts the pool down, dropping every retained instance.
    ///
    /// Idempotent, and safe to race with any other operation: concurrent
    /// callers converge on empty slots. Outstanding rented instances are not
    /// waited for; when they are later passed to [`release()`][Self::release]
    /// they are dropped immediately. [`rent()`][Self::rent] keeps working and
    /// builds every instance through the factory.
    ///
    /// Dropping the pool performs the same drain.
    pub fn shutdown(&self) {
        // Release pairs with the Acquire checks in `rent()` and `release()`.
        self.shut_down.store(true, Ordering::Release);

        Self::drain_slot(&self.fast_slot);

        for slot in &self.slots {
            Self::drain_slot(slot);
        }
    }

    /// The maximum number of instances the pool will retain.
    #[must_use]
    pub fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// Whether [`shutdown()`][Self::shutdown] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Attempts to take exclusive ownership of whatever instance `slot`
    /// currently holds.
    fn try_claim(slot: &AtomicPtr<T>) -> Option<T> {
        let observed = slot.load(Ordering::Acquire);

        if observed.is_null() {
            return None;
        }

        // The claim is keyed on the observed pointer, so two racing rents can
        // never both take the same instance; the loser moves on to the next
        // slot. AcqRel on success pairs with the publishing swap in
        // `try_park()`. A recycled allocation address (ABA) is harmless here:
        // success always transfers exclusive ownership of whichever instance
        // the slot holds at that moment.
        if slot
            .compare_exchange(observed, ptr::null_mut(), Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        // SAFETY: The exchange removed the pointer from the slot, making us
        // its sole owner. It was created by `Box::into_raw` in `release()`.
        let boxed = unsafe { Box::from_raw(observed) };

        Some(*boxed)
    }

    /// Attempts to park `parked` in `slot`, reporting whether the slot
    /// accepted it. On `false` the caller still owns the pointer.
    fn try_park(slot: &AtomicPtr<T>, parked: *mut T) -> bool {
        // Deliberately unsynchronized peek; see `release()` for the race this
        // admits. A slot that looks occupied is skipped without retrying.
        if !slot.load(Ordering::Relaxed).is_null() {
            return false;
        }

        // Release side of the pairing with the Acquire claims in
        // `try_claim()`.
        let displaced = slot.swap(parked, Ordering::AcqRel);

        if !displaced.is_null() {
            // Another release parked an instance between our peek and the
            // swap. Only one of the two can be retained; the displaced one
            // is dropped here, never leaked.
            // SAFETY: The swap removed the pointer from the slot, making us
            // its sole owner.
            drop(unsafe { Box::from_raw(displaced) });
        }

        true
    }

    /// Empties `slot`, dropping the instance it held, if any.
    fn drain_slot(slot: &AtomicPtr<T>) {
        let parked = slot.swap(ptr::null_mut(), Ordering::AcqRel);

        if !parked.is_null() {
            // SAFETY: The swap removed the pointer from the slot, making us
            // its sole owner.
            drop(unsafe { Box::from_raw(parked) });
        }
    }
}

impl<T, F> fmt::Debug for SlotPool<T, F>
where
    F: Fn() -> T,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T, F> Drop for SlotPool<T, F>
where
    F: Fn() -> T,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Four slots per processor accommodates short rent windows from every
/// processor at once without retaining an outsized instance inventory.
#[cfg_attr(test, mutants::skip)] // Mutating the multiplier only resizes the default, which no test can pin.
fn default_capacity() -> NonZero<usize> {
    thread::available_parallelism()
        .map_or(FALLBACK_CAPACITY, |processors| {
            processors.saturating_mul(SLOTS_PER_PROCESSOR)
        })
}
