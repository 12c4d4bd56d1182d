//! Shared foundation for the invoice assistant: configuration, the
//! top-level error type and the backend wire contracts.

pub mod config;
pub mod error;
pub mod types;

pub use config::AssistConfig;
pub use error::{AssistError, Result};
pub use types::*;
