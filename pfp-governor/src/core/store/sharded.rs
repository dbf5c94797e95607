use super::{RateRecord, Store};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::SystemTime;

#[cfg(feature = "ahash")]
type Hasher = ahash::RandomState;
#[cfg(not(feature = "ahash"))]
type Hasher = std::collections::hash_map::RandomState;

// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const CAPACITY_OVERHEAD_FACTOR: f64 = 1.3;

/// Sharded in-memory store
///
/// Records live in a [`DashMap`], so a decision locks only the shard that
/// holds its key. Two requests for the same identifier are serialized;
/// requests for identifiers in different shards run in parallel.
///
/// The store never cleans itself. Expired records are overwritten by the
/// next admission for the same key and removed in bulk by
/// [`Store::remove_expired`].
///
/// # Example
///
/// ```
/// use pfp_governor::{RateGovernor, ShardedStore, SystemClock};
///
/// let store = ShardedStore::builder().capacity(10_000).build();
/// let governor = RateGovernor::from_parts(store, SystemClock);
/// ```
pub struct ShardedStore {
    data: DashMap<String, RateRecord, Hasher>,
}

/// Builder for configuring a ShardedStore
///
/// # Example
///
/// ```
/// use pfp_governor::ShardedStore;
///
/// let store = ShardedStore::builder()
///     .capacity(100_000)
///     .shard_amount(64)
///     .build();
/// ```
pub struct ShardedStoreBuilder {
    capacity: usize,
    shard_amount: Option<usize>,
}

impl ShardedStore {
    /// Create a new ShardedStore with default configuration
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new ShardedStore sized for `capacity` identifiers
    ///
    /// The store will allocate 30% more space to reduce rehashing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(capacity, None)
    }

    /// Create a new builder for configuring a ShardedStore
    pub fn builder() -> ShardedStoreBuilder {
        ShardedStoreBuilder::default()
    }

    fn with_config(capacity: usize, shard_amount: Option<usize>) -> Self {
        let capacity = (capacity as f64 * CAPACITY_OVERHEAD_FACTOR) as usize;
        let data = match shard_amount {
            Some(shards) => DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                Hasher::default(),
                valid_shard_amount(shards),
            ),
            None => DashMap::with_capacity_and_hasher(capacity, Hasher::default()),
        };
        ShardedStore { data }
    }
}

// DashMap asserts a power of two greater than one
fn valid_shard_amount(shards: usize) -> usize {
    shards
        .max(2)
        .checked_next_power_of_two()
        .unwrap_or(1 << (usize::BITS - 1))
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for ShardedStore {
    fn with_record<R>(&self, key: &str, f: impl FnOnce(&mut Option<RateRecord>) -> R) -> R {
        // The entry guard holds the shard's write lock until it is dropped
        match self.data.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(*occupied.get());
                let out = f(&mut slot);
                match slot {
                    Some(record) => *occupied.get_mut() = record,
                    None => {
                        occupied.remove();
                    }
                }
                out
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                let out = f(&mut slot);
                if let Some(record) = slot {
                    vacant.insert(record);
                }
                out
            }
        }
    }

    fn get(&self, key: &str) -> Option<RateRecord> {
        self.data.get(key).map(|record| *record)
    }

    fn remove_expired(&self, now: SystemTime) -> usize {
        let mut removed = 0;
        self.data.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

impl Default for ShardedStoreBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            shard_amount: None,
        }
    }
}

impl ShardedStoreBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expected capacity (number of unique identifiers)
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of shards
    ///
    /// Values below two are raised to two, and other values are rounded up
    /// to the next power of two. When unset, the shard count is derived
    /// from the number of CPUs.
    pub fn shard_amount(mut self, shards: usize) -> Self {
        self.shard_amount = Some(shards);
        self
    }

    /// Build the ShardedStore with the configured settings
    pub fn build(self) -> ShardedStore {
        ShardedStore::with_config(self.capacity, self.shard_amount)
    }
}
