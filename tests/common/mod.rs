//! Test utilities and helper functions for the ogembed test suite

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ogembed::preview_store::{NewPreview, PreviewStore, StoredAsset, StoredPreview};
use ogembed::resolver::{ExtractedMetadata, MetadataExtractor};
use ogembed::{EmbedError, EmbedResult, ImageAsset};

/// Extractor stub with canned responses and a call counter.
///
/// URLs without a canned response fail extraction, which is exactly how
/// an unreachable page behaves.
#[allow(dead_code)]
pub struct StubExtractor {
    responses: HashMap<String, ExtractedMetadata>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubExtractor {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, url: &str, metadata: ExtractedMetadata) -> Self {
        self.responses.insert(url.to_string(), metadata);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataExtractor for StubExtractor {
    async fn extract(&self, url: &str) -> anyhow::Result<ExtractedMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some(metadata) => Ok(metadata.clone()),
            None => anyhow::bail!("upstream fetch failed for {url}"),
        }
    }
}

/// Metadata as a typical article page would publish it.
#[allow(dead_code)]
pub fn article_metadata(title: &str, image: &str, provider: &str) -> ExtractedMetadata {
    ExtractedMetadata {
        title: Some(title.to_string()),
        description: Some(format!("{title} - description")),
        image: Some(image.to_string()),
        provider_name: Some(provider.to_string()),
        ..ExtractedMetadata::default()
    }
}

/// Metadata as a video page with an embeddable iframe would publish it.
#[allow(dead_code)]
pub fn video_metadata(title: &str, provider: &str, iframe: &str) -> ExtractedMetadata {
    ExtractedMetadata {
        title: Some(title.to_string()),
        provider_name: Some(provider.to_string()),
        embed_code: Some(iframe.to_string()),
        ..ExtractedMetadata::default()
    }
}

/// Store decorator counting batch-lookup calls.
///
/// Used to assert the renderer's batching invariant: one `find_by_urls`
/// per document, never one lookup per marker.
#[allow(dead_code)]
pub struct CountingStore {
    inner: Arc<dyn PreviewStore>,
    pub find_by_urls_calls: AtomicUsize,
    pub find_assets_calls: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new(inner: Arc<dyn PreviewStore>) -> Self {
        Self {
            inner,
            find_by_urls_calls: AtomicUsize::new(0),
            find_assets_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PreviewStore for CountingStore {
    async fn find_by_url(&self, url: &str) -> EmbedResult<Option<StoredPreview>> {
        self.inner.find_by_url(url).await
    }

    async fn find_by_urls(&self, urls: &[String]) -> EmbedResult<HashMap<String, StoredPreview>> {
        self.find_by_urls_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_urls(urls).await
    }

    async fn find_assets_by_ids(&self, ids: &[i64]) -> EmbedResult<HashMap<i64, StoredAsset>> {
        self.find_assets_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_assets_by_ids(ids).await
    }

    async fn insert_asset(&self, asset: &ImageAsset) -> EmbedResult<StoredAsset> {
        self.inner.insert_asset(asset).await
    }

    async fn insert_preview(&self, preview: NewPreview) -> EmbedResult<StoredPreview> {
        self.inner.insert_preview(preview).await
    }
}

/// Store stub that fails every operation, for degradation tests.
#[allow(dead_code)]
pub struct FailingStore;

#[allow(dead_code)]
impl FailingStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PreviewStore for FailingStore {
    async fn find_by_url(&self, _url: &str) -> EmbedResult<Option<StoredPreview>> {
        Err(EmbedError::Storage("store offline".to_string()))
    }

    async fn find_by_urls(&self, _urls: &[String]) -> EmbedResult<HashMap<String, StoredPreview>> {
        Err(EmbedError::Storage("store offline".to_string()))
    }

    async fn find_assets_by_ids(&self, _ids: &[i64]) -> EmbedResult<HashMap<i64, StoredAsset>> {
        Err(EmbedError::Storage("store offline".to_string()))
    }

    async fn insert_asset(&self, _asset: &ImageAsset) -> EmbedResult<StoredAsset> {
        Err(EmbedError::Storage("store offline".to_string()))
    }

    async fn insert_preview(&self, _preview: NewPreview) -> EmbedResult<StoredPreview> {
        Err(EmbedError::Storage("store offline".to_string()))
    }
}
