//! Monotonic time source.

use embassy_time::Instant;

/// Source of the current time for deadline bookkeeping.
///
/// The firmware backs this with the embassy time driver; tests use a
/// simulated clock that only moves when told to.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }
}
