//! Core configuration types for the embed pipeline

use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    ALLOWED_IMAGE_TYPES, CACHE_PERMANENT, DEFAULT_IGNORE_TAGS, FLOOD_RETRIES_DEFAULT,
    FLOOD_WINDOW_SECS_DEFAULT, IMAGE_DOWNLOAD_TIMEOUT_SECS, IMAGE_MAX_SIZE,
};

/// Main configuration struct for embed operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Protocols matched by the URL grammar (scheme names, no `://`).
    pub(crate) protocols: Vec<String>,

    /// Literal prefix that must precede a URL for it to be converted.
    ///
    /// Empty means every matched URL is a candidate; a non-empty value
    /// lets an operator restrict auto-embedding to a chosen marker
    /// string (e.g. `"embed:"`).
    pub(crate) url_prefix: String,

    /// Tag names whose inner text is never scanned for URLs.
    pub(crate) ignore_tags: Vec<String>,

    /// Metadata cache lifetime in seconds.
    ///
    /// `0` disables caching (always fetch), [`CACHE_PERMANENT`] caches
    /// forever, positive values expire that many seconds after
    /// resolution.
    pub(crate) cache_expiration: i64,

    /// Maximum embed generations per caller per flood window.
    pub(crate) flood_retries: u32,

    /// Flood-control window in seconds.
    pub(crate) flood_window_secs: u64,

    /// Image download timeout in seconds.
    pub(crate) image_timeout_secs: u64,

    /// Maximum image download size in bytes.
    pub(crate) image_max_bytes: usize,

    /// MIME types accepted for preview images.
    pub(crate) allowed_image_types: Vec<String>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            protocols: vec!["http".to_string(), "https".to_string()],
            url_prefix: String::new(),
            ignore_tags: DEFAULT_IGNORE_TAGS.iter().map(|t| (*t).to_string()).collect(),
            cache_expiration: CACHE_PERMANENT,
            flood_retries: FLOOD_RETRIES_DEFAULT,
            flood_window_secs: FLOOD_WINDOW_SECS_DEFAULT,
            image_timeout_secs: IMAGE_DOWNLOAD_TIMEOUT_SECS,
            image_max_bytes: IMAGE_MAX_SIZE,
            allowed_image_types: ALLOWED_IMAGE_TYPES.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

impl EmbedConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> crate::config::EmbedConfigBuilder {
        crate::config::EmbedConfigBuilder::default()
    }

    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    #[must_use]
    pub fn ignore_tags(&self) -> &[String] {
        &self.ignore_tags
    }

    #[must_use]
    pub fn cache_expiration(&self) -> i64 {
        self.cache_expiration
    }

    #[must_use]
    pub fn flood_retries(&self) -> u32 {
        self.flood_retries
    }

    #[must_use]
    pub fn flood_window_secs(&self) -> u64 {
        self.flood_window_secs
    }

    #[must_use]
    pub fn image_timeout_secs(&self) -> u64 {
        self.image_timeout_secs
    }

    #[must_use]
    pub fn image_max_bytes(&self) -> usize {
        self.image_max_bytes
    }

    #[must_use]
    pub fn allowed_image_types(&self) -> &[String] {
        &self.allowed_image_types
    }
}
