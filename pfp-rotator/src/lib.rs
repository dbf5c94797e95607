//! # pfp-rotator
//!
//! Replaces a Bluesky account's avatar (and matching banner) with a random
//! image from disk, keeping the account's display name and description.
//!
//! ## Triggers
//!
//! - `/api/public-update`: anyone may call it; each client is held to a
//!   fixed-window quota (3 per hour by default) by [`pfp_governor`]
//! - `/api/update-pfp`: for a scheduler; not rate limited, optionally
//!   guarded by a bearer secret
//!
//! ## Quick Start
//!
//! ```bash
//! export BLUESKY_HANDLE=me.bsky.social
//! export BLUESKY_APP_PASSWORD=xxxx-xxxx-xxxx-xxxx
//!
//! # Serve both triggers
//! pfp-rotator --host 0.0.0.0 --port 8080
//!
//! # Or rotate once from cron
//! pfp-rotator --once
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   /api/public-update           /api/update-pfp
//!          │                            │
//!   resolve identifier                  │
//!          │                            │
//!    ┌─────▼──────┐                     │
//!    │ Governor   │◄── SweepTask        │
//!    └─────┬──────┘                     │
//!          │ admitted                   │
//!          └────────────┬───────────────┘
//!                 ┌─────▼──────┐
//!                 │ Orchestrator│── Bluesky XRPC
//!                 └────────────┘
//! ```
//!
//! Rate-limit state lives in memory and is lost on restart.

pub mod assets;
pub mod bluesky;
pub mod config;
pub mod error;
pub mod identity;
pub mod sweeper;
pub mod transport;
pub mod types;
pub mod updater;
