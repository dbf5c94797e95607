use std::time::SystemTime;


mod sharded;

pub use sharded::{ShardedStore, ShardedStoreBuilder};

/// Per-identifier state for the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRecord {
    /// Requests admitted in the current window (at least 1)
    pub count: u32,
    /// Instant the window closes
    pub reset_time: SystemTime,
}

impl RateRecord {
    /// A window is still open at its reset instant and closes strictly after it
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now > self.reset_time
    }
}

/// Store trait for governor state
pub trait Store: Send + Sync {
    /// Run `f` with exclusive access to the record for `key`
    ///
    /// `f` sees `None` when no record exists. Whatever the slot holds when
    /// `f` returns is written back: `Some` inserts or replaces, `None`
    /// removes. No other caller can observe or change the record for `key`
    /// while `f` runs.
    fn with_record<R>(&self, key: &str, f: impl FnOnce(&mut Option<RateRecord>) -> R) -> R;

    /// Get a copy of the record for `key`, expired or not
    fn get(&self, key: &str) -> Option<RateRecord>;

    /// Remove every record that has expired at `now`, returning how many were removed
    fn remove_expired(&self, now: SystemTime) -> usize;

    /// Number of records currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
