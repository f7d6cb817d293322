//! Two-pass link preview pipeline.
//!
//! Pass one ([`url_converter`]) scans HTML prose for bare URLs, without
//! touching existing markup, comments or code blocks, and replaces the
//! embeddable ones with `<og-embed data-embed-url="...">` markers. Pass
//! two ([`renderer`]) resolves those markers into rendered preview
//! fragments backed by durable records, batching store lookups per
//! document. [`embed_request`] serves the interactive reveal-on-click
//! flow with validation and flood control.
//!
//! External collaborators (metadata scraper, cache, flood control, blob
//! storage, durable store) are constructor-injected capability traits.

pub mod blob_storage;
pub mod cache;
pub mod config;
pub mod embed_request;
pub mod error;
pub mod flood;
pub mod image_ingest;
pub mod preview_store;
pub mod renderer;
pub mod resolver;
pub mod url_converter;
pub mod url_scanner;
pub mod utils;

pub use blob_storage::{BlobStorage, FileBlobStorage};
pub use cache::{MemoryPreviewCache, PreviewCache};
pub use config::{EmbedConfig, EmbedConfigBuilder};
pub use embed_request::{EmbedRequestHandler, ReplaceCommand};
pub use error::{EmbedError, EmbedResult};
pub use flood::{FloodControl, MemoryFlood};
pub use image_ingest::{ImageAsset, ImageIngestor};
pub use preview_store::{
    NewPreview, PreviewStore, SqlitePreviewStore, StoredAsset, StoredPreview,
};
pub use renderer::EmbedRenderer;
pub use resolver::{ExtractedMetadata, MetadataExtractor, PreviewMetadata, UrlResolver};
pub use url_converter::{EmbedConverter, collect_urls, embed_marker, rewrite_urls};
pub use url_scanner::{UrlSpan, find_urls};
