//! Configuration module for page captures
//!
//! This module provides the `CaptureConfig` struct and its type-safe builder
//! with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{CaptureConfigBuilder, WithOutputDir, WithTargetUrl};
pub use types::CaptureConfig;
