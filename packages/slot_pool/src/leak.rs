//! Leak diagnostics for rented pool instances.
//!
//! [`LeakTrackingPool`] wraps a [`SlotPool`] and associates every rented
//! instance with a diagnostic record. An instance that is dropped without
//! being handed back is reported through the `tracing` channel, together
//! with the call site captured at rent time. The diagnostics are strictly a
//! side channel: they never change pool behavior and never panic or block.

use std::any::type_name;
#[cfg(debug_assertions)]
use std::backtrace::Backtrace;
use std::fmt;
#[cfg(not(debug_assertions))]
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use scc::HashMap;
use tracing::warn;

use crate::SlotPool;

#[cfg(debug_assertions)]
type CapturedTrace = Backtrace;
#[cfg(not(debug_assertions))]
type CapturedTrace = PhantomData<Backtrace>;

/// Captures the rent-time call site if both:
///
/// 1. `RUST_BACKTRACE=1` is set.
/// 2. `cfg(debug_assertions)` is enabled (e.g. the default `dev` Cargo
///    profile is in use).
fn capture_call_site() -> CapturedTrace {
    #[cfg(debug_assertions)]
    {
        Backtrace::capture()
    }
    #[cfg(not(debug_assertions))]
    {
        PhantomData
    }
}

/// Diagnostic context for one outstanding rented instance.
#[derive(Debug)]
struct RentRecord {
    rented_at: CapturedTrace,
}

/// A [`SlotPool`] decorator that reports rented instances which are never
/// handed back.
///
/// Every rent is wrapped in a [`Tracked`] handle and associated with a
/// diagnostic record keyed by a rent token. Passing the handle to
/// [`release()`][Self::release] removes the record and forwards the instance
/// to the inner pool. Dropping the handle instead is the leak event: the
/// record is removed, [`detected_leaks()`][Self::detected_leaks] grows by
/// one, and a single `tracing` warning names the instance type and the
/// captured rent-time call site.
///
/// The association is keyed by token, not by the instance itself, so it
/// never extends the instance's lifetime and needs no cleanup beyond the
/// token removal. Record operations are unordered relative to the inner
/// pool's slot operations; a lookup that finds nothing is a no-op.
///
/// # Examples
///
/// ```rust
/// use slot_pool::{LeakTrackingPool, SlotPool};
///
/// let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));
///
/// let mut text = pool.rent();
/// text.push_str("audited");
///
/// // Formally hand the instance back, defusing the leak signal.
/// pool.release(text);
///
/// assert_eq!(pool.detected_leaks(), 0);
/// ```
pub struct LeakTrackingPool<T, F = fn() -> T>
where
    F: Fn() -> T,
{
    inner: SlotPool<T, F>,

    /// One record per rented instance that has not yet been returned,
    /// keyed by rent token.
    outstanding: HashMap<u64, RentRecord>,

    /// Source of rent tokens. Tokens are never reused.
    next_token: AtomicU64,

    /// Total number of leaks this pool has reported.
    detected_leaks: AtomicU64,
}

impl<T, F> LeakTrackingPool<T, F>
where
    F: Fn() -> T,
{
    /// Wraps `inner`, adding leak tracking to its rent/release cycle.
    #[must_use]
    pub fn wrap(inner: SlotPool<T, F>) -> Self {
        Self {
            inner,
            outstanding: HashMap::new(),
            next_token: AtomicU64::new(1),
            detected_leaks: AtomicU64::new(0),
        }
    }

    /// Obtains an instance from the inner pool and starts tracking it.
    ///
    /// The returned handle dereferences to the instance. It must eventually
    /// be passed to [`release()`][Self::release] (or consumed via
    /// [`Tracked::into_inner()`]); dropping it is reported as a leak.
    #[must_use]
    pub fn rent(&self) -> Tracked<'_, T, F> {
        let value = self.inner.rent();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        self.outstanding
            .insert(
                token,
                RentRecord {
                    rented_at: capture_call_site(),
                },
            )
            .expect("rent tokens are unique, so the record insert cannot collide");

        Tracked {
            value: ManuallyDrop::new(value),
            pool: self,
            token,
        }
    }

    /// Hands a tracked instance back, reporting whether the inner pool
    /// retained it.
    ///
    /// Defuses the leak signal before delegating to the inner pool's
    /// [`release()`][SlotPool::release].
    pub fn release(&self, item: Tracked<'_, T, F>) -> bool {
        debug_assert!(
            ptr::eq(self, item.pool),
            "instance was rented from a different pool"
        );

        item.release()
    }

    /// The number of rented instances that have not yet been returned.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Total number of leaks this pool has reported so far.
    #[must_use]
    pub fn detected_leaks(&self) -> u64 {
        self.detected_leaks.load(Ordering::Relaxed)
    }

    /// Shuts the inner pool down; see [`SlotPool::shutdown()`].
    ///
    /// Outstanding associations are left in place: their instances are still
    /// rented, and each is resolved when its handle is released or dropped.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Unwraps the decorator, discarding all tracking state.
    #[must_use]
    pub fn into_inner(self) -> SlotPool<T, F> {
        self.inner
    }
}

impl<T, F> fmt::Debug for LeakTrackingPool<T, F>
where
    F: Fn() -> T,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeakTrackingPool")
            .field("inner", &self.inner)
            .field("outstanding", &self.outstanding.len())
            .field(
                "detected_leaks",
                &self.detected_leaks.load(Ordering::Relaxed),
            )
            .finish()
    }
}

/// A rented instance under leak tracking.
///
/// Created by [`LeakTrackingPool::rent()`]. Dereferences to the instance.
/// Dropping this handle without first passing it to
/// [`LeakTrackingPool::release()`] (or [`into_inner()`][Self::into_inner])
/// is reported as a leak.
#[must_use = "dropping a tracked instance without releasing it is reported as a leak"]
pub struct Tracked<'p, T, F>
where
    F: Fn() -> T,
{
    /// Present from construction until the handle is consumed or dropped.
    value: ManuallyDrop<T>,

    pool: &'p LeakTrackingPool<T, F>,

    token: u64,
}

impl<T, F> Tracked<'_, T, F>
where
    F: Fn() -> T,
{
    /// Hands the instance back to the pool it was rented from, reporting
    /// whether it was retained.
    ///
    /// Equivalent to [`LeakTrackingPool::release()`].
    pub fn release(self) -> bool {
        let mut this = ManuallyDrop::new(self);

        // Removing the record defuses the leak signal before the instance
        // changes hands. A record that is already gone is a tolerated race.
        drop(this.pool.outstanding.remove(&this.token));

        // SAFETY: `this` is never dropped, so this is the only take of the
        // value.
        let value = unsafe { ManuallyDrop::take(&mut this.value) };

        this.pool.inner.release(value)
    }

    /// Detaches the instance from the pool and its tracking.
    ///
    /// The instance is not returned to the pool and no leak is reported.
    #[must_use]
    pub fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);

        drop(this.pool.outstanding.remove(&this.token));

        // SAFETY: `this` is never dropped, so this is the only take of the
        // value.
        unsafe { ManuallyDrop::take(&mut this.value) }
    }
}

impl<T, F> Deref for Tracked<'_, T, F>
where
    F: Fn() -> T,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T, F> DerefMut for Tracked<'_, T, F>
where
    F: Fn() -> T,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T, F> fmt::Debug for Tracked<'_, T, F>
where
    F: Fn() -> T,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl<T, F> Drop for Tracked<'_, T, F>
where
    F: Fn() -> T,
{
    fn drop(&mut self) {
        // `release()` and `into_inner()` both forget the handle, so reaching
        // this point means the instance was never formally returned.
        if let Some((_, record)) = self.pool.outstanding.remove(&self.token) {
            self.pool.detected_leaks.fetch_add(1, Ordering::Relaxed);
            report_leak::<T>(&record);
        }

        // SAFETY: The value is present on every path that drops the handle,
        // and this is the only take.
        unsafe { ManuallyDrop::drop(&mut self.value) };
    }
}

/// Reports a rented instance that was dropped without being returned.
///
/// Strictly diagnostic: must never panic, block, or otherwise influence pool
/// behavior.
fn report_leak<T>(record: &RentRecord) {
    // Unwinding tears values down in whatever order the stack dictates;
    // reporting those as leaks would be noise.
    if thread::panicking() {
        return;
    }

    #[cfg(debug_assertions)]
    warn!(
        instance_type = type_name::<T>(),
        rented_at = %record.rented_at,
        "pooled instance was dropped without being returned to its pool"
    );

    #[cfg(not(debug_assertions))]
    {
        let _ = record;

        warn!(
            instance_type = type_name::<T>(),
            "pooled instance was dropped without being returned to its pool"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_pool(
        created: &Arc<AtomicUsize>,
    ) -> LeakTrackingPool<Box<u8>, impl Fn() -> Box<u8>> {
        let created = Arc::clone(created);

        LeakTrackingPool::wrap(SlotPool::new(move || {
            created.fetch_add(1, Ordering::Relaxed);
            Box::new(0_u8)
        }))
    }

    #[test]
    fn release_defuses_leak_signal() {
        let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));

        let text = pool.rent();
        assert_eq!(pool.outstanding(), 1);

        assert!(pool.release(text));

        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.detected_leaks(), 0);
    }

    #[test]
    fn dropping_without_release_reports_exactly_one_leak() {
        let created = Arc::new(AtomicUsize::new(0));
        let pool = counting_pool(&created);

        let item = pool.rent();
        drop(item);

        assert_eq!(pool.detected_leaks(), 1);
        assert_eq!(pool.outstanding(), 0);

        // The leaked instance was dropped, not retained: the next rent has
        // to build again.
        let fresh = pool.rent();
        assert_eq!(created.load(Ordering::Relaxed), 2);
        drop(fresh);
    }

    #[test]
    fn released_instance_is_served_again() {
        let pool = LeakTrackingPool::wrap(SlotPool::new(|| Box::new(0_u8)));

        let first = pool.rent();
        let address: *const u8 = ptr::from_ref::<u8>(&first);

        assert!(pool.release(first));

        let second = pool.rent();
        assert_eq!(ptr::from_ref::<u8>(&second), address);
        assert!(pool.release(second));
    }

    #[test]
    fn into_inner_detaches_without_leak_report() {
        let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));

        let text = pool.rent();
        let owned = text.into_inner();

        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.detected_leaks(), 0);
        drop(owned);
    }

    #[test]
    fn release_after_shutdown_defuses_but_cannot_retain() {
        let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));

        let text = pool.rent();
        pool.shutdown();

        assert!(!pool.release(text));
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.detected_leaks(), 0);
    }

    #[test]
    fn tracked_instance_is_mutable_through_handle() {
        let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));

        let mut text = pool.rent();
        text.push_str("traced");
        assert_eq!(text.as_str(), "traced");

        assert!(pool.release(text));
    }

    #[test]
    fn tokens_distinguish_concurrent_rents() {
        let pool = LeakTrackingPool::wrap(SlotPool::new(String::new));

        let first = pool.rent();
        let second = pool.rent();
        assert_eq!(pool.outstanding(), 2);

        assert!(pool.release(first));
        assert_eq!(pool.outstanding(), 1);

        assert!(pool.release(second));
        assert_eq!(pool.outstanding(), 0);
    }
}
