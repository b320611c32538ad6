//! `cadence-core` — shared identifiers, the `Response` envelope, layered
//! configuration, and the top-level error type.
//!
//! Everything here is consumed by more than one crate in the workspace;
//! domain logic lives in `cadence-campaigns` and `cadence-pipeline`.

pub mod config;
pub mod error;
pub mod types;

pub use config::CadenceConfig;
pub use error::{CadenceError, Result};
pub use types::{CampaignId, EventId, Response};
