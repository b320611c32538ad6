//! `cadence-channels` — the publishing collaborator seam.
//!
//! Each publish target (one per channel name referenced by campaigns)
//! implements the [`Publisher`] trait and is registered in a
//! [`PublisherRegistry`]. [`WebhookPublisher`] is the shipped adapter — it
//! delivers posts as JSON to a configured endpoint; platform-specific
//! delivery logic lives behind that endpoint.

pub mod http;
pub mod publisher;
pub mod registry;

pub use http::WebhookPublisher;
pub use publisher::{OutboundPost, PublishError, PublishReceipt, Publisher};
pub use registry::PublisherRegistry;
