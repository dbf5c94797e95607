//! Core components of the governor
//!
//! - [`clock`]: Time sources
//! - [`governor`]: The fixed-window admission decision
//! - [`store`]: Storage backends for per-identifier records

pub mod clock;
pub mod governor;
pub mod store;
#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use governor::{Admission, Quota, RateGovernor};
pub use store::{RateRecord, ShardedStore, ShardedStoreBuilder, Store};

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors returned by the governor
///
/// A rejected request is not an error: it is reported through
/// [`Admission::success`]. Errors are reserved for calls that break the
/// contract.
///
/// # Example
///
/// ```
/// use pfp_governor::{GovernorError, RateGovernor};
/// use std::time::Duration;
///
/// let governor = RateGovernor::new();
///
/// match governor.admit("key", 0, Duration::from_secs(60)) {
///     Err(GovernorError::InvalidQuota { max_requests, .. }) => {
///         assert_eq!(max_requests, 0);
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernorError {
    /// `max_requests` or the window length was zero, or the window overflows the clock
    InvalidQuota {
        max_requests: u32,
        window: Duration,
    },
}

impl fmt::Display for GovernorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GovernorError::InvalidQuota {
                max_requests,
                window,
            } => write!(
                f,
                "invalid quota: {max_requests} requests per {}ms (both must be positive and the window must fit the clock)",
                window.as_millis()
            ),
        }
    }
}

impl Error for GovernorError {}
