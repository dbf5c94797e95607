//! Time sources for the governor
//!
//! Window arithmetic uses wall-clock [`SystemTime`] because reset instants
//! are reported to callers as absolute timestamps.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Reads the operating system's wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> SystemTime {
        (**self).now()
    }
}

/// A clock that only moves when told to
///
/// Time is kept as milliseconds since the Unix epoch, which is the
/// resolution windows are reported in.
///
/// # Example
///
/// ```
/// use pfp_governor::{Clock, ManualClock};
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let clock = ManualClock::from_millis(1_000);
/// clock.advance(Duration::from_millis(500));
/// assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_millis(1_500));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Start the clock at `millis` milliseconds after the Unix epoch
    pub fn from_millis(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    /// Jump to an absolute instant (may move backwards)
    pub fn set(&self, to: SystemTime) {
        self.millis.store(to_millis(to), Ordering::SeqCst);
    }

    pub fn millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.millis())
    }
}

fn to_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::from_millis(10);
        clock.advance(Duration::from_millis(5));
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.millis(), 1_015);
    }

    #[test]
    fn test_manual_clock_set_and_shared() {
        let clock = Arc::new(ManualClock::default());
        let shared: Arc<dyn Clock> = clock.clone();

        clock.set(UNIX_EPOCH + Duration::from_secs(42));
        assert_eq!(shared.now(), UNIX_EPOCH + Duration::from_secs(42));
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now() > UNIX_EPOCH);
    }
}
