//! Alert reconciliation core for the dashboard client.
//!
//! Merges snapshot frames, delta frames, and single-alert mutation results into
//! one bounded, deduplicated collection ordered newest first. Nothing here does
//! I/O; the runtime crate feeds it.

mod action_guard;
mod collection;

pub use action_guard::ActionGuard;
pub use collection::{apply_local_result, reconcile, AlertCollection, MAX_ALERTS};
