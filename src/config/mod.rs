//! Configuration module for the embed pipeline
//!
//! This module provides the `EmbedConfig` struct and its builder for
//! configuring URL conversion, metadata caching, flood control and image
//! ingestion with sensible defaults.

// Sub-modules
pub mod builder;
pub mod types;

// Re-exports for public API
pub use builder::EmbedConfigBuilder;
pub use types::EmbedConfig;
