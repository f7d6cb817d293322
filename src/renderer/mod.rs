//! Second pass: resolve embed markers into rendered preview fragments.
//!
//! A document may carry many markers for the same URL; the store is asked
//! once for the whole URL set and once for the referenced image assets,
//! never once per marker. Only URLs with no stored preview go out to the
//! resolver, and a failure materializing one marker leaves that marker in
//! place without disturbing the rest of the document.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lol_html::html_content::ContentType;
use lol_html::{HtmlRewriter, Settings, element};

use crate::image_ingest::ImageIngestor;
use crate::preview_store::{NewPreview, PreviewStore, StoredAsset, StoredPreview};
use crate::resolver::UrlResolver;
use crate::utils::constants::{EMBED_ATTRIBUTE, EMBED_TAG};

/// Renders documents containing embed markers.
pub struct EmbedRenderer {
    resolver: Arc<UrlResolver>,
    ingestor: ImageIngestor,
    store: Arc<dyn PreviewStore>,
}

impl EmbedRenderer {
    pub fn new(
        resolver: Arc<UrlResolver>,
        ingestor: ImageIngestor,
        store: Arc<dyn PreviewStore>,
    ) -> Self {
        Self {
            resolver,
            ingestor,
            store,
        }
    }

    /// Replace resolvable embed markers in `html` with preview fragments.
    ///
    /// Markers that cannot be resolved are left untouched; a document
    /// without markers is returned unchanged. Replacing the whole marker
    /// element makes a second pass over already-rendered output a no-op.
    pub async fn render(&self, html: &str) -> String {
        if !html.contains(EMBED_ATTRIBUTE) {
            return html.to_string();
        }

        let urls = collect_marker_urls(html);
        if urls.is_empty() {
            return html.to_string();
        }

        // One lookup for every URL in the document.
        let previews = match self.store.find_by_urls(&urls).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("preview batch lookup failed: {e}");
                HashMap::new()
            }
        };

        // One lookup for every image asset those previews reference.
        let asset_ids: Vec<i64> = previews.values().filter_map(|p| p.image).collect();
        let mut assets = match self.store.find_assets_by_ids(&asset_ids).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("asset batch lookup failed: {e}");
                HashMap::new()
            }
        };

        let mut resolved: Vec<(String, StoredPreview)> = Vec::with_capacity(urls.len());
        let mut unmatched_asset_ids: Vec<i64> = Vec::new();

        for url in &urls {
            let preview = match previews.get(url) {
                Some(existing) => existing.clone(),
                None => match self.materialize(url, &mut assets).await {
                    Some(created) => created,
                    None => continue,
                },
            };

            if let Some(asset_id) = preview.image
                && !assets.contains_key(&asset_id)
            {
                unmatched_asset_ids.push(asset_id);
            }
            resolved.push((url.clone(), preview));
        }

        // A lost insert race can reference an asset we did not create;
        // fetch those stragglers in one final batch.
        if !unmatched_asset_ids.is_empty() {
            match self.store.find_assets_by_ids(&unmatched_asset_ids).await {
                Ok(found) => assets.extend(found),
                Err(e) => log::warn!("asset batch lookup failed: {e}"),
            }
        }

        let mut rendered: HashMap<String, String> = HashMap::with_capacity(resolved.len());
        for (url, preview) in resolved {
            let image_uri = preview
                .image
                .and_then(|id| assets.get(&id))
                .map(|asset| asset.uri.clone());
            rendered.insert(url, render_preview_fragment(&preview, image_uri.as_deref()));
        }

        substitute_markers(html, &rendered)
    }

    /// Resolve, ingest and persist a preview for a URL seen for the first
    /// time. Returns `None` (after logging) when any step fails; the
    /// caller skips the marker.
    async fn materialize(
        &self,
        url: &str,
        assets: &mut HashMap<i64, StoredAsset>,
    ) -> Option<StoredPreview> {
        let metadata = match self.resolver.resolve(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("skipping embed marker for {url}: {e}");
                return None;
            }
        };

        let Some(image_url) = metadata.image.as_deref() else {
            log::warn!("skipping embed marker for {url}: metadata has no image");
            return None;
        };

        let image = self.ingestor.fetch_image(image_url).await?;

        let stored_asset = match self.store.insert_asset(&image).await {
            Ok(asset) => asset,
            Err(e) => {
                log::warn!("failed to persist image asset for {url}: {e}");
                return None;
            }
        };
        assets.insert(stored_asset.id, stored_asset.clone());

        match self
            .store
            .insert_preview(NewPreview {
                url: url.to_string(),
                title: metadata.title,
                description: metadata.description,
                provider_name: metadata.provider_name,
                image: Some(stored_asset.id),
            })
            .await
        {
            Ok(preview) => Some(preview),
            Err(e) => {
                log::warn!("failed to persist preview for {url}: {e}");
                None
            }
        }
    }
}

/// Collect marker URLs in document order, deduplicated.
fn collect_marker_urls(html: &str) -> Vec<String> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse(&format!("{EMBED_TAG}[{EMBED_ATTRIBUTE}]"))
        .expect("marker selector");

    let mut urls = Vec::new();
    let mut seen = HashSet::new();
    for element in document.select(&selector) {
        if let Some(url) = element.value().attr(EMBED_ATTRIBUTE) {
            if !url.is_empty() && seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }
    }
    urls
}

/// Streaming substitution of marker elements with rendered fragments.
fn substitute_markers(html: &str, rendered: &HashMap<String, String>) -> String {
    let mut output = Vec::with_capacity(html.len());
    let selector = format!("{EMBED_TAG}[{EMBED_ATTRIBUTE}]");

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!(selector, |el| {
                if let Some(raw) = el.get_attribute(EMBED_ATTRIBUTE) {
                    let url = html_escape::decode_html_entities(&raw).into_owned();
                    if let Some(fragment) = rendered.get(&url) {
                        el.replace(fragment, ContentType::Html);
                    }
                }
                Ok(())
            })],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    if rewriter.write(html.as_bytes()).is_err() {
        log::warn!("marker substitution failed, returning document unchanged");
        return html.to_string();
    }
    if rewriter.end().is_err() {
        log::warn!("marker substitution failed, returning document unchanged");
        return html.to_string();
    }

    match String::from_utf8(output) {
        Ok(text) => text,
        Err(_) => {
            log::warn!("marker substitution produced invalid UTF-8, returning document unchanged");
            html.to_string()
        }
    }
}

/// Render the fixed preview fragment for a stored preview.
fn render_preview_fragment(preview: &StoredPreview, image_uri: Option<&str>) -> String {
    let url = html_escape::encode_double_quoted_attribute(&preview.url);
    let mut fragment = String::with_capacity(256);

    fragment.push_str("<div class=\"og-embed-preview\">");
    fragment.push_str(&format!("<a href=\"{url}\">"));

    if let Some(uri) = image_uri {
        let src = html_escape::encode_double_quoted_attribute(uri);
        fragment.push_str(&format!("<img src=\"{src}\" alt=\"Article image\">"));
    }

    fragment.push_str("<div class=\"og-embed-preview-info\">");
    if let Some(provider) = preview.provider_name.as_deref() {
        fragment.push_str(&format!(
            "<span class=\"og-embed-provider\">{}</span>",
            html_escape::encode_text(provider)
        ));
    }
    if let Some(title) = preview.title.as_deref() {
        fragment.push_str(&format!(
            "<h3 class=\"og-embed-title\">{}</h3>",
            html_escape::encode_text(title)
        ));
    }
    if let Some(description) = preview.description.as_deref() {
        fragment.push_str(&format!(
            "<p class=\"og-embed-description\">{}</p>",
            html_escape::encode_text(description)
        ));
    }
    fragment.push_str("</div></a></div>");

    fragment
}
