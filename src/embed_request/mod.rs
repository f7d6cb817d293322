//! Request-scoped façade for the interactive reveal-on-click flow.
//!
//! A client posts the URL it wants revealed plus the UUID of the
//! placeholder to swap out. The handler validates both, applies flood
//! control for the caller, resolves the URL and answers with a single
//! replace-this-selector instruction for the transport layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::EmbedConfig;
use crate::error::{EmbedError, EmbedResult};
use crate::flood::FloodControl;
use crate::resolver::UrlResolver;
use crate::utils::constants::FLOOD_EVENT_NAME;
use crate::utils::url_utils::is_valid_url;

/// A node-replacement instruction for the caller's transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceCommand {
    /// CSS selector of the placeholder to replace.
    pub selector: String,
    /// Replacement HTML.
    pub content: String,
}

/// Handles interactive embed requests.
pub struct EmbedRequestHandler {
    resolver: Arc<UrlResolver>,
    flood: Arc<dyn FloodControl>,
    config: EmbedConfig,
}

impl EmbedRequestHandler {
    pub fn new(
        resolver: Arc<UrlResolver>,
        flood: Arc<dyn FloodControl>,
        config: EmbedConfig,
    ) -> Self {
        Self {
            resolver,
            flood,
            config,
        }
    }

    /// Generate the replacement content for one reveal request.
    ///
    /// `caller` identifies the requesting client for flood accounting
    /// (the identifier carries no trust implication, it only scopes
    /// which placeholder gets replaced).
    ///
    /// # Errors
    ///
    /// [`EmbedError::Validation`] for a malformed URL or identifier,
    /// [`EmbedError::RateLimited`] when the caller exceeded the flood
    /// budget. Resolution failures are not errors: they fall back to a
    /// plain hyperlink.
    pub async fn handle(
        &self,
        raw_url: &str,
        raw_identifier: &str,
        caller: &str,
    ) -> EmbedResult<ReplaceCommand> {
        if raw_url.is_empty() {
            return Err(EmbedError::Validation("missing url parameter".to_string()));
        }
        if !is_valid_url(raw_url) {
            return Err(EmbedError::Validation(format!("invalid url: {raw_url}")));
        }

        let uuid = Uuid::parse_str(raw_identifier)
            .map_err(|_| EmbedError::Validation(format!("invalid uuid: {raw_identifier}")))?;

        let event_key = format!("{FLOOD_EVENT_NAME}:{caller}");
        let allowed = self
            .flood
            .is_allowed(
                &event_key,
                self.config.flood_retries(),
                self.config.flood_window_secs(),
            )
            .await;
        if !allowed {
            return Err(EmbedError::RateLimited(event_key));
        }
        self.flood
            .register(&event_key, self.config.flood_window_secs())
            .await;

        let selector = format!("#og-embed-iframe-{uuid}");
        let content = match self.resolver.resolve(raw_url).await {
            Ok(info) if info.has_embed_code() => {
                let provider = info
                    .provider_name
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase();
                let class = html_escape::encode_double_quoted_attribute(&provider).into_owned();
                let code = info.embed_code.as_deref().unwrap_or_default();
                format!(
                    "<div id=\"og-embed-iframe-{uuid}\" class=\"og-embed-iframe-{class}\"><p>{code}</p></div>"
                )
            }
            Ok(_) => plain_link(raw_url),
            Err(e) => {
                log::warn!("embed request for {raw_url} falling back to plain link: {e}");
                plain_link(raw_url)
            }
        };

        Ok(ReplaceCommand { selector, content })
    }
}

/// Escaped plain-hyperlink fallback.
fn plain_link(url: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        html_escape::encode_double_quoted_attribute(url),
        html_escape::encode_text(url)
    )
}
