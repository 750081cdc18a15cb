//! URL construction with per-segment percent escaping.
//!
//! Identifiers embedded in paths are caller-controlled; each one is escaped
//! so that a value containing `/` or other reserved characters always lands
//! in the final URL as exactly one segment.

use crate::error::Error;

/// Builds a URL from a base, an ordered list of path segments, and query
/// parameters appended after path construction.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    url: String,
    has_query: bool,
}

impl UrlBuilder {
    /// Starts from an already-normalized base URL (no trailing slash).
    pub fn new(base_url: &str) -> Self {
        Self {
            url: base_url.to_string(),
            has_query: false,
        }
    }

    /// Appends one path segment, percent-escaping every byte outside the
    /// unreserved set. `/` becomes `%2F`, so `foo/../../bar` stays a single
    /// segment.
    pub fn push(mut self, segment: &str) -> Self {
        self.url.push('/');
        self.url.push_str(&urlencoding::encode(segment));
        self
    }

    /// Appends a string query parameter. The value is percent-escaped.
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.push(if self.has_query { '&' } else { '?' });
        self.has_query = true;
        self.url.push_str(name);
        self.url.push('=');
        self.url.push_str(&urlencoding::encode(value));
        self
    }

    /// Appends a string parameter only when the value is present.
    pub fn query_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    /// Appends a boolean parameter as `true`/`false`.
    pub fn query_bool(self, name: &str, value: bool) -> Self {
        self.query(name, if value { "true" } else { "false" })
    }

    /// Appends a boolean parameter only when it is `true`.
    pub fn query_flag(self, name: &str, value: bool) -> Self {
        if value { self.query_bool(name, value) } else { self }
    }

    /// Appends an integer parameter in decimal.
    pub fn query_u64(self, name: &str, value: u64) -> Self {
        self.query(name, &value.to_string())
    }

    /// Appends an integer parameter only when present.
    pub fn query_u64_opt(self, name: &str, value: Option<u64>) -> Self {
        match value {
            Some(value) => self.query_u64(name, value),
            None => self,
        }
    }

    pub fn finish(self) -> String {
        self.url
    }
}

/// Normalizes a configured base URL: trims whitespace, strips any trailing
/// slash, and requires an `http://` or `https://` scheme with a host.
pub fn normalize_base_url(raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::validation("base url must not be empty"));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::validation(
            "base url must use http:// or https:// and include a host",
        ));
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(Error::validation(
            "base url must use http:// or https:// and include a host",
        ));
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(Error::validation(
            "base url must use http:// or https:// and include a host",
        ));
    }
    Ok(trimmed.to_string())
}
