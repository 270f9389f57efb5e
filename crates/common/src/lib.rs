//! Reframe Common Utilities
//!
//! Shared infrastructure for all Reframe crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading and the render policy

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
