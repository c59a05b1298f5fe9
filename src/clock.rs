use std::time::Instant;

/// Source of "now" for time-based effects (torch expiry, trap release).
/// Injected into the session so tests can drive time by hand; effects are
/// checked lazily against this clock on the next move or visibility call,
/// never on a background timer.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The system wall clock, used by every non-test session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
