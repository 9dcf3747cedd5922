//! fleetup-conductor: authenticated access to a router conductor.
//!
//! # Components
//!
//! - **`api`**: the `ConductorApi` trait the rollout engine is written against
//! - **`client`**: `RestConductor`, the REST/GraphQL implementation
//! - **`snapshot`**: per-router views over one asset listing
//! - **`cache`**: best-effort release-list cache and token file
//!
//! Coarse status strings are parsed into `NodeStatus` at the boundary;
//! an unrecognized status or a router reporting more than two status
//! entries is an error rather than free text passed along.

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod snapshot;
mod wire;

pub use api::ConductorApi;
pub use client::{ConductorSettings, Credentials, RestConductor};
pub use error::{ConductorError, ConductorResult};
pub use snapshot::AssetSnapshot;
