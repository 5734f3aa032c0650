//! Shared utilities for the file-share function workspace

// Re-export common dependencies
pub use thiserror;
pub use tracing;

pub mod crypto;
pub mod observability;
