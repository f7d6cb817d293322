//! Tag-aware first pass: replace bare URLs in HTML prose with embed markers.
//!
//! This module deliberately avoids a full HTML parser. Only two things
//! matter here: where tags begin and end (so text is never scanned across
//! a tag boundary), and whether we are inside a tag whose inner text must
//! be left alone (an existing link, a code block). A regex chunk splitter
//! tracking a single open-ignore-tag state covers both; malformed markup
//! degrades to best-effort splitting instead of an error.
//!
//! HTML comments are protected with indexed placeholders before the pass
//! and restored afterwards, so URLs inside comments are never rewritten.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::EmbedConfig;
use crate::resolver::UrlResolver;
use crate::url_scanner::url_regex;
use crate::utils::constants::{EMBED_ATTRIBUTE, EMBED_TAG};

/// Greedy "looks like a tag" boundary matcher. Semantic validity is not
/// required, only boundary detection.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<.+?>").expect("tag pattern"));

/// HTML comments, including multi-line ones.
static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));

/// Build the placeholder element for an embeddable URL.
///
/// The URL is carried in the [`EMBED_ATTRIBUTE`] attribute for the second
/// pass ([`crate::renderer`]) to resolve.
#[must_use]
pub fn embed_marker(url: &str) -> String {
    format!(
        "<{EMBED_TAG} {EMBED_ATTRIBUTE}=\"{}\"></{EMBED_TAG}>",
        html_escape::encode_double_quoted_attribute(url)
    )
}

/// Replace URL matches in text chunks of `html` via `url_to_marker`.
///
/// For every URL found outside tags, comments and ignore-tag content, the
/// callback receives the entity-decoded URL:
///
/// - `Ok(Some(marker))` substitutes the matched span with `marker`;
/// - `Ok(None)` leaves the span unchanged (URL not embeddable);
/// - `Err(_)` is logged and leaves the span unchanged; one bad URL never
///   aborts the pass.
pub fn rewrite_urls<F>(html: &str, config: &EmbedConfig, mut url_to_marker: F) -> String
where
    F: FnMut(&str) -> anyhow::Result<Option<String>>,
{
    // Protect comments verbatim before any splitting.
    let mut comments: Vec<String> = Vec::new();
    let protected = COMMENT_RE.replace_all(html, |caps: &regex::Captures| {
        let idx = comments.len();
        comments.push(caps.get(0).map_or("", |m| m.as_str()).to_string());
        format!("<!--og:c{idx}-->")
    });

    let url_re = url_regex(config.protocols(), config.url_prefix());
    let open_ignore_re = build_open_ignore_re(config.ignore_tags());

    // Split into alternating text/tag chunks, processing text chunks
    // in place while tracking the ignore state across tag chunks.
    let mut output = String::with_capacity(protected.len());
    let mut open_tag: Option<String> = None;
    let mut last = 0;

    for tag in TAG_RE.find_iter(&protected) {
        let text = &protected[last..tag.start()];
        if open_tag.is_none() {
            output.push_str(&replace_in_text(text, &url_re, &mut url_to_marker));
        } else {
            output.push_str(text);
        }

        match &open_tag {
            None => {
                if let Some(caps) = open_ignore_re.captures(tag.as_str()) {
                    open_tag = caps.get(1).map(|m| m.as_str().to_lowercase());
                }
            }
            Some(name) => {
                if is_close_tag(tag.as_str(), name) {
                    open_tag = None;
                }
            }
        }
        output.push_str(tag.as_str());
        last = tag.end();
    }

    let trailing = &protected[last..];
    if open_tag.is_none() {
        output.push_str(&replace_in_text(trailing, &url_re, &mut url_to_marker));
    } else {
        output.push_str(trailing);
    }

    // Restore protected comments.
    for (idx, comment) in comments.iter().enumerate() {
        output = output.replace(&format!("<!--og:c{idx}-->"), comment);
    }
    output
}

/// Collect the URLs `rewrite_urls` would offer for conversion, in
/// document order, deduplicated.
///
/// Used to pre-resolve URLs before an async rewrite pass.
#[must_use]
pub fn collect_urls(html: &str, config: &EmbedConfig) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen = HashSet::new();
    rewrite_urls(html, config, |url| {
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
        Ok(None)
    });
    urls
}

fn replace_in_text<F>(text: &str, url_re: &Regex, url_to_marker: &mut F) -> String
where
    F: FnMut(&str) -> anyhow::Result<Option<String>>,
{
    if text.is_empty() {
        return String::new();
    }

    url_re
        .replace_all(text, |caps: &regex::Captures| {
            let full = caps.get(0).map_or("", |m| m.as_str());
            let url = caps.get(1).map_or("", |m| m.as_str());
            let decoded = html_escape::decode_html_entities(url);
            match url_to_marker(&decoded) {
                Ok(Some(marker)) => marker,
                Ok(None) => full.to_string(),
                Err(e) => {
                    log::warn!("error converting URL {decoded}: {e:#}");
                    full.to_string()
                }
            }
        })
        .into_owned()
}

/// Matches an opening tag from the ignore set, e.g. `<a href=..>` or `<code>`.
fn build_open_ignore_re(ignore_tags: &[String]) -> Regex {
    let names = ignore_tags
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)^<({names})(?:\s|>)")).expect("ignore-tag pattern")
}

fn is_close_tag(tag: &str, name: &str) -> bool {
    let trimmed = tag.trim_start_matches('<').trim_start();
    trimmed
        .strip_prefix('/')
        .map(str::trim_start)
        .is_some_and(|rest| {
            let bytes = rest.as_bytes();
            bytes.len() >= name.len()
                && bytes[..name.len()].eq_ignore_ascii_case(name.as_bytes())
                && rest[name.len()..].trim_start().starts_with('>')
        })
}

/// Async façade over the first pass: resolve URLs, then rewrite.
///
/// URLs are collected up front, resolved concurrently through the shared
/// [`UrlResolver`], and only those that produced usable metadata are
/// replaced with markers. Resolution failures leave the URL as plain text.
pub struct EmbedConverter {
    resolver: Arc<UrlResolver>,
    config: EmbedConfig,
}

impl EmbedConverter {
    /// Create a converter backed by the given resolver.
    pub fn new(resolver: Arc<UrlResolver>, config: EmbedConfig) -> Self {
        Self { resolver, config }
    }

    /// Replace embeddable URLs in `html` with marker elements.
    pub async fn convert(&self, html: &str) -> String {
        let candidates = collect_urls(html, &self.config);
        if candidates.is_empty() {
            return html.to_string();
        }

        let checks = candidates.iter().map(|url| {
            let resolver = Arc::clone(&self.resolver);
            async move {
                match resolver.resolve(url).await {
                    Ok(_) => Some(url.clone()),
                    Err(e) => {
                        log::debug!("URL {url} not embeddable: {e}");
                        None
                    }
                }
            }
        });

        let embeddable: HashSet<String> = futures::future::join_all(checks)
            .await
            .into_iter()
            .flatten()
            .collect();

        rewrite_urls(html, &self.config, |url| {
            Ok(embeddable.contains(url).then(|| embed_marker(url)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmbedConfig {
        EmbedConfig::default()
    }

    fn mark_all(html: &str) -> String {
        rewrite_urls(html, &config(), |url| Ok(Some(embed_marker(url))))
    }

    #[test]
    fn replaces_url_in_prose() {
        let out = mark_all("Check https://example.com/a(b) out");
        assert_eq!(
            out,
            "Check <og-embed data-embed-url=\"https://example.com/a(b)\"></og-embed> out"
        );
    }

    #[test]
    fn url_inside_anchor_untouched() {
        let html = r#"<a href="https://example.com">https://example.com</a>"#;
        assert_eq!(mark_all(html), html);
    }

    #[test]
    fn url_inside_code_and_pre_untouched() {
        let html = "<code>https://example.com</code> and <pre>https://other.org</pre>";
        assert_eq!(mark_all(html), html);
    }

    #[test]
    fn url_after_closed_ignore_tag_is_converted() {
        let html = "<code>https://a.com</code> then https://b.com here";
        let out = mark_all(html);
        assert!(out.contains("<code>https://a.com</code>"));
        assert!(out.contains("data-embed-url=\"https://b.com\""));
    }

    #[test]
    fn url_inside_comment_untouched() {
        let html = "before <!-- see https://example.com --> after https://other.org end";
        let out = mark_all(html);
        assert!(out.contains("<!-- see https://example.com -->"));
        assert!(out.contains("data-embed-url=\"https://other.org\""));
    }

    #[test]
    fn multiline_comment_untouched() {
        let html = "x <!--\nhttps://example.com\n--> y";
        assert_eq!(mark_all(html), html);
    }

    #[test]
    fn non_embeddable_url_left_as_text() {
        let html = "see https://example.com now";
        let out = rewrite_urls(html, &config(), |_| Ok(None));
        assert_eq!(out, html);
    }

    #[test]
    fn callback_error_leaves_url_and_continues() {
        let html = "bad https://fail.example then good https://ok.example end";
        let out = rewrite_urls(html, &config(), |url| {
            if url.contains("fail") {
                anyhow::bail!("resolver exploded");
            }
            Ok(Some(embed_marker(url)))
        });
        assert!(out.contains("bad https://fail.example then"));
        assert!(out.contains("data-embed-url=\"https://ok.example\""));
    }

    #[test]
    fn entity_encoded_url_is_decoded_for_callback() {
        let html = "go https://example.com/?a=1&amp;b=2 now";
        let mut seen = Vec::new();
        rewrite_urls(html, &config(), |url| {
            seen.push(url.to_string());
            Ok(None)
        });
        assert_eq!(seen, vec!["https://example.com/?a=1&b=2"]);
    }

    #[test]
    fn attribute_values_never_scanned() {
        let html = r#"<img src="https://example.com/pic.png"> trailing"#;
        assert_eq!(mark_all(html), html);
    }

    #[test]
    fn nested_markup_tolerated() {
        let html = "<div><p>go https://example.com</p></div>";
        let out = mark_all(html);
        assert!(out.contains("data-embed-url=\"https://example.com\""));
        assert!(out.starts_with("<div><p>go "));
    }

    #[test]
    fn uppercase_ignore_tags_respected() {
        let html = "<A HREF=\"x\">https://example.com</A>";
        assert_eq!(mark_all(html), html);
    }

    #[test]
    fn collect_urls_dedups_in_order() {
        let html = "a https://one.example b https://two.example c https://one.example";
        assert_eq!(
            collect_urls(html, &config()),
            vec!["https://one.example", "https://two.example"]
        );
    }

    #[test]
    fn collect_urls_skips_ignored_regions() {
        let html = "<a href=\"#\">https://skip.example</a> https://take.example <!-- https://no.example -->";
        assert_eq!(collect_urls(html, &config()), vec!["https://take.example"]);
    }

    #[test]
    fn plain_text_without_urls_unchanged() {
        let html = "<p>hello world, nothing to embed</p>";
        assert_eq!(mark_all(html), html);
    }
}
