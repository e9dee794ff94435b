//! Published document snapshot.

/// Serialized live document as served over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub html: String,
    /// Quoted blake3 hex digest of `html`, ready for an `ETag` header.
    pub etag: String,
}

impl PageSnapshot {
    pub fn new(html: String) -> Self {
        let etag = format!("\"{}\"", hex::encode(&blake3::hash(html.as_bytes()).as_bytes()[..16]));
        Self { html, etag }
    }

    /// Whether an `If-None-Match` header value matches this snapshot.
    pub fn matches(&self, if_none_match: &str) -> bool {
        if_none_match
            .split(',')
            .map(str::trim)
            .any(|tag| tag == "*" || tag.trim_start_matches("W/") == self.etag)
    }
}
