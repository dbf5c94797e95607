//! Fixed-window admission decisions
//!
//! This module provides [`RateGovernor`], which admits or rejects requests
//! per identifier against a quota of `max_requests` per window.

use super::{Clock, GovernorError, RateRecord, ShardedStore, Store, SystemClock};
use std::time::{Duration, SystemTime};

const DEFAULT_MAX_REQUESTS: u32 = 10;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Result of an admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether the request may proceed
    pub success: bool,
    /// Requests still available in the current window (0 when rejected)
    pub remaining: u32,
    /// Instant the current window closes
    pub reset_time: SystemTime,
}

/// A request budget: `max_requests` per `window`
///
/// Call sites choose their own quota. The default is 10 requests per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub max_requests: u32,
    pub window: Duration,
}

impl Quota {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// `max_requests` per hour
    pub const fn per_hour(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60 * 60))
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Fixed-window request governor
///
/// Owns its [`Store`] and reads time from a [`Clock`]. Construct one and
/// share it with an `Arc`; every method takes `&self`.
///
/// # Example
///
/// ```
/// use pfp_governor::{Quota, RateGovernor};
///
/// let governor = RateGovernor::new();
/// let quota = Quota::per_hour(3);
///
/// for expected in [2, 1, 0] {
///     let admission = governor
///         .admit("198.51.100.4", quota.max_requests, quota.window)
///         .unwrap();
///     assert!(admission.success);
///     assert_eq!(admission.remaining, expected);
/// }
///
/// let rejected = governor
///     .admit("198.51.100.4", quota.max_requests, quota.window)
///     .unwrap();
/// assert!(!rejected.success);
/// ```
pub struct RateGovernor<S: Store = ShardedStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
}

impl RateGovernor {
    /// Create a governor with a default [`ShardedStore`] and the system clock
    pub fn new() -> Self {
        Self::from_parts(ShardedStore::new(), SystemClock)
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateGovernor<ShardedStore, C> {
    /// Create a governor with a default [`ShardedStore`] and the given clock
    pub fn with_clock(clock: C) -> Self {
        Self::from_parts(ShardedStore::new(), clock)
    }
}

impl<S: Store, C: Clock> RateGovernor<S, C> {
    pub fn from_parts(store: S, clock: C) -> Self {
        RateGovernor { store, clock }
    }

    /// Decide whether `identifier` may make another request
    ///
    /// # Parameters
    ///
    /// - `identifier`: The key requests are bucketed by (e.g., a client IP)
    /// - `max_requests`: Requests admitted per window
    /// - `window`: Window length
    ///
    /// # Errors
    ///
    /// - [`GovernorError::InvalidQuota`]: If `max_requests` or `window` is zero,
    ///   or `window` is too long to add to the current time
    pub fn admit(
        &self,
        identifier: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<Admission, GovernorError> {
        self.admit_at(identifier, max_requests, window, self.clock.now())
    }

    /// Same as [`admit`](Self::admit) with an explicit timestamp
    pub fn admit_at(
        &self,
        identifier: &str,
        max_requests: u32,
        window: Duration,
        now: SystemTime,
    ) -> Result<Admission, GovernorError> {
        let invalid = GovernorError::InvalidQuota {
            max_requests,
            window,
        };
        if max_requests == 0 || window.is_zero() {
            return Err(invalid);
        }
        // A window that cannot be added to the clock has no reset instant
        let fresh_reset = now.checked_add(window).ok_or(invalid)?;

        let admission = self.store.with_record(identifier, |slot| {
            if let Some(record) = slot.as_mut().filter(|r| !r.is_expired(now)) {
                if record.count >= max_requests {
                    // Full: reject without touching the record
                    return Admission {
                        success: false,
                        remaining: 0,
                        reset_time: record.reset_time,
                    };
                }

                record.count += 1;
                return Admission {
                    success: true,
                    remaining: max_requests - record.count,
                    reset_time: record.reset_time,
                };
            }

            // First request, or first request after the window closed
            *slot = Some(RateRecord {
                count: 1,
                reset_time: fresh_reset,
            });
            Admission {
                success: true,
                remaining: max_requests - 1,
                reset_time: fresh_reset,
            }
        });

        Ok(admission)
    }

    /// Remove every record whose window has closed
    ///
    /// Returns the number of records removed. Admission decisions do not
    /// depend on this running; it only bounds memory.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now())
    }

    /// Same as [`sweep`](Self::sweep) with an explicit timestamp
    pub fn sweep_at(&self, now: SystemTime) -> usize {
        self.store.remove_expired(now)
    }

    /// Current record for `identifier`, if one is held (expired or not)
    pub fn record(&self, identifier: &str) -> Option<RateRecord> {
        self.store.get(identifier)
    }

    /// Number of identifiers currently tracked
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
