//! `cadence-pipeline` — stage runners and the background job manager.
//!
//! # Overview
//!
//! The pipeline drives campaigns through three idempotent stages:
//!
//! | Stage      | Work set                                | Action                      |
//! |------------|------------------------------------------|-----------------------------|
//! | `schedule` | events of campaigns inside their window  | mark event scheduled        |
//! | `generate` | scheduled events without a post          | draft content via generator |
//! | `publish`  | due events with a draft post             | deliver to every channel    |
//!
//! Every stage returns one [`Response`](cadence_core::Response) per work
//! item; an item failure is recorded and iteration continues. The
//! [`JobManager`](manager::JobManager) runs the full sequence on a timer
//! until stopped.

pub mod manager;
pub mod stages;
pub mod types;

pub use manager::JobManager;
pub use stages::Pipeline;
pub use types::{Job, ManagerState, ManagerStatus, Operation, StageItem};
