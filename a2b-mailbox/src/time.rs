//! Monotonic time source

pub use embassy_time::{Duration, Instant};

/// Monotonic clock the transports read on every tick
///
/// The clock must never go backwards. Resolution should be at least one millisecond,
/// since timeouts are configured in milliseconds.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
