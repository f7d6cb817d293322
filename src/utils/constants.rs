//! Shared configuration constants for ogembed
//!
//! This module contains default values and limits used throughout the
//! codebase to ensure consistency and avoid magic numbers.

/// Element name of the placeholder inserted for an embeddable URL.
///
/// The first pass replaces a matched URL with
/// `<og-embed data-embed-url="..."></og-embed>`; the second pass resolves
/// these elements into rendered previews.
pub const EMBED_TAG: &str = "og-embed";

/// Attribute on [`EMBED_TAG`] that carries the target URL.
///
/// Kept stable: stored documents reference this attribute name.
pub const EMBED_ATTRIBUTE: &str = "data-embed-url";

/// Default number of embed generations a single caller may trigger
/// per flood window.
pub const FLOOD_RETRIES_DEFAULT: u32 = 50;

/// Default flood-control window in seconds.
pub const FLOOD_WINDOW_SECS_DEFAULT: u64 = 300;

/// Name of the flood event registered per embed generation request.
pub const FLOOD_EVENT_NAME: &str = "ogembed.generate_embed";

/// Maximum accepted URL length.
///
/// 2083 is the lowest common denominator among user agents; longer
/// values are rejected as invalid input rather than truncated.
pub const URL_MAX_LENGTH: usize = 2083;

/// Maximum stored title length, in characters.
pub const TITLE_MAX_LENGTH: usize = 255;

/// Maximum image download size in bytes (5 MiB).
///
/// Enforced twice: against the Content-Length header before the body is
/// read, and chunk-by-chunk while streaming.
pub const IMAGE_MAX_SIZE: usize = 5 * 1024 * 1024;

/// Image download timeout in seconds.
pub const IMAGE_DOWNLOAD_TIMEOUT_SECS: u64 = 10;

/// MIME types accepted for preview images.
///
/// Compared against the Content-Type base type after any charset
/// parameter has been stripped.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// URL schemes accepted for outbound fetches and embed requests.
pub const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https"];

/// Tag names whose inner text is never scanned for URLs.
pub const DEFAULT_IGNORE_TAGS: &[&str] = &["a", "script", "style", "code", "pre"];

/// Sentinel for [`crate::config::EmbedConfig::cache_expiration`]: cache
/// resolved metadata forever. `0` disables caching; positive values are
/// TTL seconds.
pub const CACHE_PERMANENT: i64 = -1;

/// Prefix for metadata cache keys.
pub const CACHE_KEY_PREFIX: &str = "ogembed";
