//! `cadence-content` — the content-generation collaborator seam.
//!
//! The pipeline's Generate stage talks to an external generation service
//! through the [`ContentGenerator`] trait. [`HttpGenerator`] is the shipped
//! adapter: a thin JSON bridge to whatever endpoint the deployment
//! configures. Platform-specific prompt construction lives behind that
//! endpoint, not here.

pub mod generator;
pub mod http;

pub use generator::{ContentGenerator, GeneratedContent, GenerateRequest, GeneratorError};
pub use http::HttpGenerator;
