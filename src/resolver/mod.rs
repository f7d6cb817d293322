//! Resolve a URL to preview metadata, via cache or a fresh extraction.
//!
//! The metadata extractor itself (an OpenGraph/oEmbed scraper) is an
//! injected capability; this module owns the projection into
//! [`PreviewMetadata`] and the resolve-or-fetch caching policy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::PreviewCache;
use crate::config::EmbedConfig;
use crate::error::{EmbedError, EmbedResult};
use crate::utils::constants::{CACHE_KEY_PREFIX, CACHE_PERMANENT};

/// Raw field set produced by the metadata-extraction capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    /// URL of the page's preview image, if any.
    pub image: Option<String>,
    pub provider_name: Option<String>,
    /// Embeddable HTML snippet (typically an iframe), if the page offers one.
    pub embed_code: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio: Option<f64>,
    pub published_time: Option<DateTime<Utc>>,
    /// Content kind as reported by the page (e.g. "article", "video").
    pub kind: Option<String>,
}

impl ExtractedMetadata {
    /// True when the extraction yielded nothing a preview could be built
    /// from: no title, no description, no image, no embed snippet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.embed_code.is_none()
    }
}

/// Preview metadata for one URL, immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub provider_name: Option<String>,
    pub embed_code: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio: Option<f64>,
    pub published_time: Option<DateTime<Utc>>,
    pub kind: Option<String>,
}

impl PreviewMetadata {
    /// Metadata with all fields empty, for building test values.
    #[must_use]
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            description: None,
            image: None,
            provider_name: None,
            embed_code: None,
            width: None,
            height: None,
            aspect_ratio: None,
            published_time: None,
            kind: None,
        }
    }

    fn from_extracted(url: &str, extracted: ExtractedMetadata) -> Self {
        Self {
            url: url.to_string(),
            title: extracted.title,
            description: extracted.description,
            image: extracted.image,
            provider_name: extracted.provider_name,
            embed_code: extracted.embed_code,
            width: extracted.width,
            height: extracted.height,
            aspect_ratio: extracted.aspect_ratio,
            published_time: extracted.published_time,
            kind: extracted.kind,
        }
    }

    /// True when the page offered an embeddable snippet.
    #[must_use]
    pub fn has_embed_code(&self) -> bool {
        self.embed_code.as_deref().is_some_and(|code| !code.is_empty())
    }
}

/// Opaque metadata-extraction capability (an OpenGraph/oEmbed scraper).
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Fetch and extract preview metadata for `url`.
    async fn extract(&self, url: &str) -> anyhow::Result<ExtractedMetadata>;
}

/// Resolves URLs to [`PreviewMetadata`] with resolve-or-fetch caching.
///
/// Safe to call concurrently. Two concurrent resolutions of the same URL
/// may both hit the extractor; the cache write is last-writer-wins over
/// identical immutable data, so no locking is needed at this layer.
pub struct UrlResolver {
    extractor: Arc<dyn MetadataExtractor>,
    cache: Arc<dyn PreviewCache>,
    config: EmbedConfig,
}

impl UrlResolver {
    /// Create a resolver over the given extractor and cache.
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        cache: Arc<dyn PreviewCache>,
        config: EmbedConfig,
    ) -> Self {
        Self {
            extractor,
            cache,
            config,
        }
    }

    /// Resolve `url` to preview metadata.
    ///
    /// Returns [`EmbedError::Extraction`] when the upstream fetch fails or
    /// yields nothing usable; callers typically degrade to rendering the
    /// original link.
    pub async fn resolve(&self, url: &str) -> EmbedResult<PreviewMetadata> {
        let expire = self.config.cache_expiration();
        let key = format!("{CACHE_KEY_PREFIX}:{url}");

        if expire != 0 {
            if let Some(cached) = self.cache.get(&key).await {
                log::debug!("metadata cache hit for {url}");
                return Ok(cached);
            }
        }

        let extracted = self
            .extractor
            .extract(url)
            .await
            .map_err(|e| EmbedError::Extraction {
                url: url.to_string(),
                message: format!("{e:#}"),
            })?;

        if extracted.is_empty() {
            return Err(EmbedError::Extraction {
                url: url.to_string(),
                message: "no usable metadata".to_string(),
            });
        }

        let metadata = PreviewMetadata::from_extracted(url, extracted);

        if expire != 0 {
            let expires_at = if expire == CACHE_PERMANENT {
                None
            } else {
                Some(Utc::now() + Duration::seconds(expire))
            };
            self.cache.set(&key, metadata.clone(), expires_at).await;
        }

        Ok(metadata)
    }
}
