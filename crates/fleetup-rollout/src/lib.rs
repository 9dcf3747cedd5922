//! fleetup rollout engine: staged release rollout across a router fleet.
//!
//! Selected routers are processed in chunks. Each chunk first downloads
//! the target release to every router that needs it, then upgrades them,
//! polling the conductor until each phase converges or times out.
//!
//! # Components
//!
//! - **`selector`**: base set, blacklist, and `key=value` filters
//! - **`catalog`**: installable releases and release ordering
//! - **`machine`**: pure per-router download/upgrade transitions
//! - **`controller`**: poll loops, timeouts, and status writes for one chunk
//! - **`scheduler`**: chunk windows and the end-of-run summary
//! - **`clock`**: time source, with a virtual clock for tests

pub mod catalog;
pub mod clock;
pub mod controller;
pub mod error;
pub mod machine;
pub mod options;
pub mod scheduler;
pub mod selector;

pub use catalog::{ReleaseCatalog, is_older, resolve_target};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ChunkReport, Controller, Exclusion, ExclusionReason};
pub use error::{RolloutError, RolloutResult};
pub use machine::Phase;
pub use options::RolloutOptions;
pub use scheduler::{RolloutSummary, chunk_windows, run_rollout};
pub use selector::{Fleet, RouterFilter, Selection, read_name_file, select};
