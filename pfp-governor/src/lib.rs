//! # pfp-governor
//!
//! An in-memory, fixed-window request governor keyed by caller identifier.
//!
//! ## Overview
//!
//! Each identifier (typically a client network address) gets a window of a
//! fixed length that opens on its first request. Inside the window at most
//! `max_requests` requests are admitted; further requests are rejected
//! without being counted. Once the window has passed, the next request opens
//! a fresh window.
//!
//! Fixed windows admit a burst at the window boundary: a caller can spend its
//! whole quota at the end of one window and again at the start of the next,
//! so up to `2 × max_requests` requests may land in a short span. This is
//! part of the contract.
//!
//! ## Quick Start
//!
//! ```
//! use pfp_governor::RateGovernor;
//! use std::time::Duration;
//!
//! let governor = RateGovernor::new();
//!
//! // 3 requests per hour for this caller
//! let admission = governor
//!     .admit("203.0.113.7", 3, Duration::from_secs(3600))
//!     .unwrap();
//!
//! assert!(admission.success);
//! assert_eq!(admission.remaining, 2);
//! ```
//!
//! ## Expired Records
//!
//! Expired records are replaced lazily by [`RateGovernor::admit`], so the
//! decision never depends on cleanup. To bound memory, call
//! [`RateGovernor::sweep`] on a schedule; it removes every record whose
//! window has passed.
//!
//! ## Time
//!
//! The governor reads time through the [`Clock`] trait. [`SystemClock`] is
//! the default; [`ManualClock`] lets tests move time explicitly:
//!
//! ```
//! use pfp_governor::{ManualClock, RateGovernor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = Arc::new(ManualClock::from_millis(0));
//! let governor = RateGovernor::with_clock(Arc::clone(&clock));
//!
//! let window = Duration::from_millis(1_000);
//! assert!(governor.admit("key", 1, window).unwrap().success);
//! assert!(!governor.admit("key", 1, window).unwrap().success);
//!
//! clock.advance(Duration::from_millis(1_001));
//! assert!(governor.admit("key", 1, window).unwrap().success);
//! ```
//!
//! ## Thread Safety
//!
//! [`RateGovernor`] is `Send + Sync` and takes `&self`. Share it with an
//! `Arc`. Decisions for the same identifier are serialized by the store;
//! decisions for different identifiers only contend when they hash to the
//! same shard.
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for faster hashing

pub mod core;

pub use crate::core::{
    Admission, Clock, GovernorError, ManualClock, Quota, RateGovernor, RateRecord, ShardedStore,
    ShardedStoreBuilder, Store, SystemClock,
};

pub use crate::core::store;
