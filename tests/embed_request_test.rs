//! Interactive embed requests: validation, flood control, fallbacks.

mod common;

use std::sync::Arc;

use common::{StubExtractor, article_metadata, video_metadata};
use ogembed::cache::MemoryPreviewCache;
use ogembed::embed_request::EmbedRequestHandler;
use ogembed::flood::MemoryFlood;
use ogembed::resolver::UrlResolver;
use ogembed::{EmbedConfig, EmbedError};

const UUID: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

fn handler(extractor: StubExtractor, config: EmbedConfig) -> EmbedRequestHandler {
    let resolver = Arc::new(UrlResolver::new(
        Arc::new(extractor),
        Arc::new(MemoryPreviewCache::new()),
        config.clone(),
    ));
    EmbedRequestHandler::new(resolver, Arc::new(MemoryFlood::new()), config)
}

#[tokio::test]
async fn embeddable_url_yields_iframe_container() {
    let extractor = StubExtractor::new().with(
        "https://video.example/v/1",
        video_metadata("Clip", "VideoSite", "<iframe src=\"https://video.example/embed/1\"></iframe>"),
    );
    let handler = handler(extractor, EmbedConfig::default());

    let command = handler
        .handle("https://video.example/v/1", UUID, "client-1")
        .await
        .expect("handle");

    assert_eq!(command.selector, format!("#og-embed-iframe-{UUID}"));
    assert!(command.content.contains(&format!("id=\"og-embed-iframe-{UUID}\"")));
    // Provider name is lowercased into the container class.
    assert!(command.content.contains("class=\"og-embed-iframe-videosite\""));
    assert!(command.content.contains("<iframe src="));
}

#[tokio::test]
async fn metadata_without_embed_code_falls_back_to_link() {
    let extractor = StubExtractor::new().with(
        "https://article.example/post",
        article_metadata("Post", "https://img/p.png", "Example"),
    );
    let handler = handler(extractor, EmbedConfig::default());

    let command = handler
        .handle("https://article.example/post", UUID, "client-1")
        .await
        .expect("handle");

    assert!(command.content.starts_with("<a href=\"https://article.example/post\">"));
}

#[tokio::test]
async fn extraction_failure_falls_back_to_link() {
    let handler = handler(StubExtractor::new(), EmbedConfig::default());

    let command = handler
        .handle("https://down.example", UUID, "client-1")
        .await
        .expect("resolution failure must not surface");

    assert!(command.content.contains("https://down.example"));
    assert!(command.content.starts_with("<a href="));
}

#[tokio::test]
async fn empty_url_is_validation_error() {
    let handler = handler(StubExtractor::new(), EmbedConfig::default());
    let err = handler.handle("", UUID, "c").await.expect_err("must fail");
    assert!(matches!(err, EmbedError::Validation(_)));
}

#[tokio::test]
async fn malformed_url_is_validation_error() {
    let handler = handler(StubExtractor::new(), EmbedConfig::default());
    for bad in ["not a url", "ftp://example.com", "javascript:alert(1)"] {
        let err = handler.handle(bad, UUID, "c").await.expect_err("must fail");
        assert!(matches!(err, EmbedError::Validation(_)), "{bad}");
    }
}

#[tokio::test]
async fn overlong_url_is_validation_error() {
    let handler = handler(StubExtractor::new(), EmbedConfig::default());
    let long = format!("https://example.com/{}", "a".repeat(2100));
    let err = handler.handle(&long, UUID, "c").await.expect_err("must fail");
    assert!(matches!(err, EmbedError::Validation(_)));
}

#[tokio::test]
async fn malformed_uuid_is_validation_error() {
    let handler = handler(StubExtractor::new(), EmbedConfig::default());
    let err = handler
        .handle("https://example.com", "not-a-uuid", "c")
        .await
        .expect_err("must fail");
    assert!(matches!(err, EmbedError::Validation(_)));
}

#[tokio::test]
async fn third_request_in_window_is_rate_limited() {
    let config = EmbedConfig::builder().flood_limits(2, 300).build();
    let handler = handler(StubExtractor::new(), config);

    handler
        .handle("https://example.com", UUID, "flooder")
        .await
        .expect("first");
    handler
        .handle("https://example.com", UUID, "flooder")
        .await
        .expect("second");
    let err = handler
        .handle("https://example.com", UUID, "flooder")
        .await
        .expect_err("third must be limited");

    assert!(matches!(err, EmbedError::RateLimited(_)));
    assert!(err.is_user_error());
}

#[tokio::test]
async fn flood_budget_is_per_caller() {
    let config = EmbedConfig::builder().flood_limits(1, 300).build();
    let handler = handler(StubExtractor::new(), config);

    handler
        .handle("https://example.com", UUID, "alice")
        .await
        .expect("alice's first");
    handler
        .handle("https://example.com", UUID, "bob")
        .await
        .expect("bob is unaffected by alice's budget");
}

#[tokio::test]
async fn elapsed_window_resets_the_count() {
    // Zero-second window: every registered event expires immediately.
    let config = EmbedConfig::builder().flood_limits(2, 0).build();
    let handler = handler(StubExtractor::new(), config);

    for _ in 0..5 {
        handler
            .handle("https://example.com", UUID, "burst")
            .await
            .expect("expired events never count against the budget");
    }
}

#[tokio::test]
async fn validation_failures_do_not_consume_flood_budget() {
    let config = EmbedConfig::builder().flood_limits(1, 300).build();
    let handler = handler(StubExtractor::new(), config);

    for _ in 0..3 {
        let _ = handler.handle("", UUID, "careful").await;
    }
    handler
        .handle("https://example.com", UUID, "careful")
        .await
        .expect("rejected input must not count as an event");
}
