//! fleetup-state: rollout status bookkeeping.
//!
//! # Architecture
//!
//! `StatusTracker` owns the `RouterName → RolloutStatus` map for one run.
//! When configured with a status file, the full map is rendered as
//! fixed-width text and rewritten after every change, so an interrupted
//! run leaves its last known state on disk.

pub mod error;
pub mod status_file;
pub mod tracker;

pub use error::{StateError, StateResult};
pub use status_file::StatusFile;
pub use tracker::StatusTracker;
