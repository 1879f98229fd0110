//! Shared utilities and error types for the Mica IL workbench
//!
//! This crate provides common functionality used across all workbench components:
//! - Error types and handling utilities
//! - Cooperative cancellation
//! - Debug-message sinks

pub mod cancel;
pub mod debug;
pub mod error;

pub use cancel::*;
pub use debug::*;
pub use error::*;
