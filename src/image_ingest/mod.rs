//! Download, validate and persist remote preview images.
//!
//! Every failure path returns `None`: a missing thumbnail degrades the
//! preview, it never fails the document pass. The size limit is enforced
//! twice: against the Content-Length header before the body is read, and
//! chunk-by-chunk while streaming, so a lying header cannot push past the
//! cap.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;

use crate::blob_storage::BlobStorage;
use crate::config::EmbedConfig;
use crate::utils::url_utils::has_allowed_scheme;

/// A validated, durably stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Storage URI returned by the blob-storage capability.
    pub uri: String,
    /// Base MIME type, charset parameter stripped.
    pub mime_type: String,
    pub byte_size: usize,
}

/// Downloads and stores preview images.
pub struct ImageIngestor {
    client: Client,
    storage: Arc<dyn BlobStorage>,
    config: EmbedConfig,
}

impl ImageIngestor {
    pub fn new(client: Client, storage: Arc<dyn BlobStorage>, config: EmbedConfig) -> Self {
        Self {
            client,
            storage,
            config,
        }
    }

    /// Fetch, validate and persist the image at `url`.
    ///
    /// Returns `None` on any failure (disallowed scheme, network error,
    /// disallowed MIME type, oversize response, storage failure) after
    /// logging; the caller falls back to a preview without an image.
    pub async fn fetch_image(&self, url: &str) -> Option<ImageAsset> {
        if !has_allowed_scheme(url) {
            log::warn!("invalid URL scheme for image: {url}");
            return None;
        }

        let (bytes, mime_type) = match self.download(url).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                log::warn!("failed to download image from {url}: {e:#}");
                return None;
            }
        };

        let name = sanitize_remote_filename(url);
        match self.storage.save(&bytes, &name).await {
            Ok(uri) => Some(ImageAsset {
                uri,
                mime_type,
                byte_size: bytes.len(),
            }),
            Err(e) => {
                log::warn!("failed to store image from {url}: {e:#}");
                None
            }
        }
    }

    /// Core download: timeout, MIME gate, double-checked size cap.
    async fn download(&self, url: &str) -> Result<(Vec<u8>, String)> {
        let max_bytes = self.config.image_max_bytes();

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.image_timeout_secs()))
            .send()
            .await
            .context("Failed to download image")?;

        if !response.status().is_success() {
            anyhow::bail!("image download failed with status: {}", response.status());
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Strip any charset parameter: "image/png; charset=binary" -> "image/png".
        let mime_type = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        if !self
            .config
            .allowed_image_types()
            .iter()
            .any(|allowed| allowed == &mime_type)
        {
            anyhow::bail!("disallowed image type: {mime_type:?}");
        }

        // Enforce the limit BEFORE downloading when the server declares a size.
        let expected_size = response.content_length().unwrap_or(0);
        if expected_size > max_bytes as u64 {
            anyhow::bail!(
                "image too large: {expected_size} bytes exceeds limit of {max_bytes} bytes"
            );
        }

        let mut buffer = if expected_size > 0 {
            Vec::with_capacity(expected_size as usize)
        } else {
            Vec::new()
        };

        // Stream with size checking as the second line of defense.
        let mut stream = response.bytes_stream();
        let mut total_size = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.context("Failed to read image chunk")?;

            let new_total = total_size + chunk.len();
            if new_total > max_bytes {
                anyhow::bail!(
                    "image download exceeded size limit during download: {new_total} bytes (max: {max_bytes})"
                );
            }

            buffer.extend_from_slice(&chunk);
            total_size = new_total;
        }

        Ok((buffer, mime_type))
    }
}

/// Derive a safe filename from a remote image URL.
///
/// Query string and fragment are dropped, the last path segment is taken,
/// and every character outside `[A-Za-z0-9._-]` becomes `_`.
#[must_use]
pub fn sanitize_remote_filename(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let basename = without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image");

    basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_query_and_fragment() {
        assert_eq!(
            sanitize_remote_filename("https://img.example/pic.png?w=300&h=200#top"),
            "pic.png"
        );
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(
            sanitize_remote_filename("https://img.example/ünsafe name%20(1).png"),
            "_nsafe_name_20_1_.png"
        );
    }

    #[test]
    fn sanitize_falls_back_for_bare_host() {
        assert_eq!(sanitize_remote_filename("https://img.example/"), "image");
    }
}
