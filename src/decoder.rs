//! Transparent response body decompression
//!
//! Servers advertise compression through the content-encoding header; the
//! fetch client routes bodies through here before callers see them. Deflate is
//! tried raw first and zlib-wrapped second, since servers disagree on which
//! framing the token means.

use std::io::Read;

use bzip2::read::BzDecoder;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use reqwest::header::{CONTENT_ENCODING, HeaderMap};

use crate::error::{Error, Result};

/// Content encodings the decoder understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEncoding {
    /// gzip framing
    Gzip,
    /// deflate, raw or zlib-wrapped
    Deflate,
    /// bzip2 framing
    Bzip2,
}

impl ContentEncoding {
    /// Parse a content-encoding header value; `None` for identity or unknown encodings
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" => Some(ContentEncoding::Gzip),
            "deflate" => Some(ContentEncoding::Deflate),
            "bzip2" => Some(ContentEncoding::Bzip2),
            _ => None,
        }
    }

    /// Canonical header token for this encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Bzip2 => "bzip2",
        }
    }
}

/// Decompress `body` according to the response's content-encoding header
///
/// Bodies with no content-encoding, or one the decoder does not understand,
/// pass through untouched.
pub fn decode_body(headers: &HeaderMap, body: Vec<u8>) -> Result<Vec<u8>> {
    let encoding = headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .and_then(ContentEncoding::from_header);

    match encoding {
        Some(encoding) => decode(encoding, &body),
        None => Ok(body),
    }
}

/// Decompress `body` with a known encoding
pub fn decode(encoding: ContentEncoding, body: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        ContentEncoding::Gzip => read_all(GzDecoder::new(body), encoding),
        ContentEncoding::Deflate => inflate(body),
        ContentEncoding::Bzip2 => read_all(BzDecoder::new(body), encoding),
    }
}

/// Raw deflate first, zlib-wrapped as the fallback
fn inflate(body: &[u8]) -> Result<Vec<u8>> {
    match read_all(DeflateDecoder::new(body), ContentEncoding::Deflate) {
        Ok(decoded) => Ok(decoded),
        Err(_) => read_all(ZlibDecoder::new(body), ContentEncoding::Deflate),
    }
}

fn read_all<R: Read>(mut reader: R, encoding: ContentEncoding) -> Result<Vec<u8>> {
    let mut decoded = Vec::new();
    reader
        .read_to_end(&mut decoded)
        .map_err(|e| Error::Decode {
            encoding: encoding.as_str().to_string(),
            reason: e.to_string(),
        })?;
    Ok(decoded)
}
