//! Client-side synchronization of game views against a polled, append-only
//! ledger.
//!
//! The ledger is only reachable through a [`LedgerAdapter`]: a height, range
//! scoped event queries and point-in-time record reads. On top of that this
//! crate provides the block range event poller, the game snapshot
//! reconcilers, the history paginator and the [`LedgerSync`] facade that
//! hands out cancellable subscriptions.

pub mod adapter;
pub mod config;
pub mod cursor;
pub mod dedup;
pub mod error;
pub mod events;
pub mod history;
pub mod poller;
pub mod reconcile;
pub mod rules;
pub mod scheduler;
pub mod stats;
pub mod sync;
pub mod telemetry;
pub mod types;

pub use adapter::LedgerAdapter;
pub use config::SyncConfig;
pub use error::{
    Outcome,
    Result,
    SyncError,
};
pub use sync::LedgerSync;
