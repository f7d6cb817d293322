//! Fluent builder for `EmbedConfig`
//!
//! All fields have working defaults, so the builder is plain fluent style
//! rather than typestate: construct, override what you need, `build()`.

use super::types::EmbedConfig;

/// Builder for [`EmbedConfig`].
#[derive(Debug, Clone, Default)]
pub struct EmbedConfigBuilder {
    config: EmbedConfig,
}

impl EmbedConfigBuilder {
    /// Set the protocols matched by the URL grammar (scheme names only).
    #[must_use]
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Require a literal prefix before URLs eligible for conversion.
    #[must_use]
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.url_prefix = prefix.into();
        self
    }

    /// Replace the set of tags whose inner text is never scanned.
    #[must_use]
    pub fn ignore_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignore_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the metadata cache lifetime in seconds.
    ///
    /// `0` disables caching, [`crate::utils::constants::CACHE_PERMANENT`]
    /// caches forever.
    #[must_use]
    pub fn cache_expiration(mut self, seconds: i64) -> Self {
        self.config.cache_expiration = seconds;
        self
    }

    /// Set the flood-control budget: `retries` events per `window_secs`.
    #[must_use]
    pub fn flood_limits(mut self, retries: u32, window_secs: u64) -> Self {
        self.config.flood_retries = retries;
        self.config.flood_window_secs = window_secs;
        self
    }

    /// Set the image download timeout in seconds.
    #[must_use]
    pub fn image_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.image_timeout_secs = seconds;
        self
    }

    /// Set the maximum image download size in bytes.
    #[must_use]
    pub fn image_max_bytes(mut self, bytes: usize) -> Self {
        self.config.image_max_bytes = bytes;
        self
    }

    /// Replace the accepted image MIME types.
    #[must_use]
    pub fn allowed_image_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_image_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> EmbedConfig {
        self.config
    }
}
