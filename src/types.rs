//! Core types for parfetch

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Inclusive byte range within a resource, as sent in HTTP Range requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// First byte offset covered by the range
    pub start: u64,
    /// Last byte offset covered by the range (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Create a range covering bytes `start` through `end`, both inclusive
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes the range covers
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Inclusive ranges always span at least one byte
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Format as an HTTP Range header value, e.g. `bytes=34-67`
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Specification of a single fetch: target URL, extra headers, optional byte range
///
/// Built with a consuming builder and immutable once issued. Header names are
/// matched case-insensitively against the configured defaults; call-specific
/// values win on collision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestSpec {
    url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<ByteRange>,
}

impl RequestSpec {
    /// Create a spec for a plain GET of `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            range: None,
        }
    }

    /// Add a call-specific header, overriding any configured default with the
    /// same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Restrict the fetch to an inclusive byte range
    pub fn range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    /// The target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call-specific headers in insertion order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The byte range restriction, if any
    pub fn byte_range(&self) -> Option<ByteRange> {
        self.range
    }
}

impl From<&str> for RequestSpec {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for RequestSpec {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// Redirect classification for the status codes the engine resolves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectClass {
    /// 301 Moved Permanently
    Permanent,
    /// 302 Found
    Found,
    /// 303 See Other (followed even when redirect following is disabled)
    SeeOther,
    /// 307 Temporary Redirect
    Temporary,
}

/// Status code to redirect class mapping. Exactly these four codes trigger
/// resolution; any other status is returned to the caller as-is.
const REDIRECT_TABLE: [(u16, RedirectClass); 4] = [
    (301, RedirectClass::Permanent),
    (302, RedirectClass::Found),
    (303, RedirectClass::SeeOther),
    (307, RedirectClass::Temporary),
];

impl RedirectClass {
    /// Classify an HTTP status code against the redirect table
    pub fn classify(status: u16) -> Option<Self> {
        REDIRECT_TABLE
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, class)| *class)
    }

    /// The status code this class corresponds to
    pub fn status_code(&self) -> u16 {
        match self {
            RedirectClass::Permanent => 301,
            RedirectClass::Found => 302,
            RedirectClass::SeeOther => 303,
            RedirectClass::Temporary => 307,
        }
    }
}

/// Normalized record of one resolved fetch
///
/// Captures the final URL after redirect resolution, the terminal exchange's
/// status, headers and body, and the superseded redirect responses (oldest
/// first). Transport failures produce a record with no status and the error
/// flag set rather than an `Err`, so batch consumers see a single record shape
/// for everything that reached the network.
#[derive(Debug, Default)]
pub struct ResponseRecord {
    /// Final URL after redirect resolution
    pub url: String,
    /// HTTP status of the terminal exchange; `None` when the transport failed
    pub status: Option<u16>,
    /// Response headers (ordered multi-map)
    pub headers: HeaderMap,
    /// Body bytes, decompressed when content decoding is enabled
    pub body: Vec<u8>,
    /// Charset from the content-type parameter, when present
    pub charset: Option<String>,
    /// The failure attached to this exchange, if any
    pub error: Option<Error>,
    /// Superseded redirect records, oldest first; empty when no redirects occurred
    pub history: Vec<ResponseRecord>,
}

impl ResponseRecord {
    /// Whether this exchange carries a failure (transport error or HTTP error status)
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// First value of header `name`, when present and representable as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Record for a request that never completed an HTTP exchange
    pub(crate) fn transport_failure(url: impl Into<String>, error: Error) -> Self {
        Self {
            url: url.into(),
            error: Some(error),
            ..Self::default()
        }
    }
}
