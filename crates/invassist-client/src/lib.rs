//! HTTP access to the invoice assistant backend.
//!
//! `AssistantBackend` is the seam the conversation core talks through;
//! `AssistantClient` implements it over reqwest.

pub mod backend;
pub mod client;
pub mod error;

pub use backend::{AssistantBackend, ExportPayload};
pub use client::AssistantClient;
pub use error::ClientError;
