//! URL validation helpers.

use url::Url;

use crate::utils::constants::{ALLOWED_URL_SCHEMES, URL_MAX_LENGTH};

/// Check if a URL is a well-formed absolute URL with an allowed scheme.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() || url.len() > URL_MAX_LENGTH {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes early.
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => ALLOWED_URL_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}

/// Check whether a URL's scheme is in the allowed set.
///
/// Unlike [`is_valid_url`] this imposes no length cap; it is the gate used
/// by image ingestion where the URL came from resolved metadata rather
/// than user input.
#[must_use]
pub fn has_allowed_scheme(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => ALLOWED_URL_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}
