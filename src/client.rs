//! HTTP fetch client with manual redirect handling.
//!
//! The client walks redirect chains itself instead of delegating to the
//! transport, so every intermediate response is recorded and the
//! redirect policy (including the hop budget and the always-follow rule
//! for see-other) stays in one place. Transport failures are reported
//! inside the returned [`ResponseRecord`] rather than as errors, which
//! lets batch callers treat one dead URL as one bad record instead of a
//! failed run.

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RANGE};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::decoder;
use crate::error::{Error, Result};
use crate::types::{ByteRange, RedirectClass, RequestSpec, ResponseRecord};
use crate::utils;

/// HTTP client bound to a configuration snapshot.
///
/// Construction validates the configuration and builds the underlying
/// transport once; the client is cheap to share behind an `Arc` across
/// batch workers and segment tasks.
pub struct FetchClient {
    http: reqwest::Client,
    config: Config,
}

impl FetchClient {
    /// Build a client from the given configuration.
    ///
    /// The underlying transport never follows redirects on its own and
    /// never decompresses bodies; both are handled here so the behavior
    /// matches the configuration instead of the transport's defaults.
    /// Proxy entries that do not parse are logged and skipped, leaving
    /// the client to connect directly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration fails validation
    /// and [`Error::Network`] when the transport cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if config.http.use_proxy {
            for (scheme, target) in &config.http.proxies {
                let proxy = match scheme.as_str() {
                    "http" => reqwest::Proxy::http(target),
                    "https" => reqwest::Proxy::https(target),
                    other => {
                        warn!(scheme = %other, "ignoring proxy entry for unsupported scheme");
                        continue;
                    }
                };
                match proxy {
                    Ok(proxy) => builder = builder.proxy(proxy),
                    Err(e) => {
                        warn!(
                            scheme = %scheme,
                            target = %target,
                            error = %e,
                            "ignoring malformed proxy entry, connecting directly"
                        );
                    }
                }
            }
        }

        let http = builder.build()?;
        Ok(Self { http, config })
    }

    /// The configuration snapshot this client was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// Fetch a URL and return a record of the final response.
    ///
    /// Redirects are followed according to the configured policy, with
    /// each intermediate response appended to the record's history,
    /// oldest hop first. See-other responses are followed even when
    /// redirects are disabled. A redirect pointing back at the URL it
    /// came from is returned as-is instead of looping.
    ///
    /// Transport failures (timeouts, refused connections) come back as a
    /// record whose `error` field is set and whose `status` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the exchange itself is impossible: an
    /// empty target URL, an exhausted redirect budget, a redirect target
    /// that cannot be resolved, or a body that fails to decode.
    pub async fn send(&self, spec: &RequestSpec) -> Result<ResponseRecord> {
        if spec.url().trim().is_empty() {
            return Err(Error::UrlRequired);
        }

        let headers = self.merged_headers(spec);
        let mut url = spec.url().to_string();
        let mut history: Vec<ResponseRecord> = Vec::new();

        loop {
            let mut record = self.fetch_once(&url, &headers, spec.byte_range()).await?;

            let Some(class) = record.status.and_then(RedirectClass::classify) else {
                record.history = history;
                return Ok(record);
            };

            // See-other redirects are always followed; the rest obey the config
            if !self.config.redirect.follow_redirects && class != RedirectClass::SeeOther {
                record.history = history;
                return Ok(record);
            }

            let Some(location) = record.header("location").map(str::to_string) else {
                record.history = history;
                return Ok(record);
            };

            if location == url {
                debug!(url = %url, "redirect target equals the current URL, stopping here");
                record.history = history;
                return Ok(record);
            }

            history.push(record);
            if history.len() >= self.config.redirect.max_redirects {
                return Err(Error::TooManyRedirects {
                    url,
                    hops: history.len(),
                });
            }

            let next = normalize_location(&url, &location)?;
            debug!(from = %url, to = %next, class = ?class, "following redirect");
            url = next;
        }
    }

    /// Fetch a URL and return only the final response headers.
    ///
    /// # Errors
    ///
    /// Unlike [`FetchClient::send`], a flagged record is converted into
    /// an error here: callers asking for headers alone have nothing to
    /// work with when the exchange failed.
    pub async fn headers_of(&self, spec: &RequestSpec) -> Result<HeaderMap> {
        let record = self.send(spec).await?;
        match record.error {
            Some(error) => Err(error),
            None => Ok(record.headers),
        }
    }

    /// Resolve the total size of a resource from its `Content-Length`.
    ///
    /// # Errors
    ///
    /// A missing, unparseable, or zero-valued header is an error; the
    /// segment planner needs a real size before it can partition the
    /// resource.
    pub async fn size_of(&self, spec: &RequestSpec) -> Result<u64> {
        let headers = self.headers_of(spec).await?;
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        if size == 0 {
            return Err(Error::Request(format!(
                "could not determine content size for {}",
                spec.url()
            )));
        }
        Ok(size)
    }

    /// Determine the filename a download of this URL should be saved as.
    ///
    /// Prefers the `Content-Disposition` header of the final response,
    /// then the last path segment of the final URL. The final URL is
    /// used so a redirect to the real file location names the file
    /// correctly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] when neither source yields a name, or
    /// the flagged error when the exchange failed.
    pub async fn file_name_of(&self, spec: &RequestSpec) -> Result<String> {
        let record = self.send(spec).await?;
        if let Some(error) = record.error {
            return Err(error);
        }
        record
            .header("content-disposition")
            .and_then(utils::file_name_from_disposition)
            .or_else(|| utils::file_name_from_url(&record.url))
            .ok_or_else(|| {
                Error::Request(format!("could not determine file name for {}", spec.url()))
            })
    }

    /// Open a streaming request for one byte range without walking
    /// redirects.
    ///
    /// Only the connection phase is bounded by the configured timeout.
    /// The body is read incrementally by the caller, which applies its
    /// own per-read deadline, so an overall request timeout would kill
    /// long segment transfers that are making progress.
    pub(crate) async fn open_range(
        &self,
        spec: &RequestSpec,
        range: ByteRange,
    ) -> Result<reqwest::Response> {
        if spec.url().trim().is_empty() {
            return Err(Error::UrlRequired);
        }

        let mut headers = self.merged_headers(spec);
        insert_header(&mut headers, RANGE.as_str(), &range.header_value());

        let request = self.http.get(spec.url()).headers(headers);
        let response = tokio::time::timeout(self.config.timeout(), request.send())
            .await
            .map_err(|_| Error::Timeout {
                url: spec.url().to_string(),
            })??;
        Ok(response)
    }

    /// Merge configured default headers with call-specific ones.
    ///
    /// Names are matched case-insensitively and a call-specific value
    /// replaces the default for the same name.
    fn merged_headers(&self, spec: &RequestSpec) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.http.default_headers {
            insert_header(&mut headers, name, value);
        }
        for (name, value) in spec.headers() {
            insert_header(&mut headers, name, value);
        }
        headers
    }

    /// Issue a single request and build the record for its response.
    ///
    /// Transport failures come back as `Ok` with a flagged record; `Err`
    /// is reserved for bodies that fail to decode.
    async fn fetch_once(
        &self,
        url: &str,
        headers: &HeaderMap,
        range: Option<ByteRange>,
    ) -> Result<ResponseRecord> {
        let mut request = self
            .http
            .get(url)
            .headers(headers.clone())
            .timeout(self.config.timeout());
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(url = %url, "request timed out");
                return Ok(ResponseRecord::transport_failure(
                    url,
                    Error::Timeout {
                        url: url.to_string(),
                    },
                ));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "request failed before a response arrived");
                return Ok(ResponseRecord::transport_failure(url, Error::Network(e)));
            }
        };

        self.build_record(response).await
    }

    async fn build_record(&self, response: reqwest::Response) -> Result<ResponseRecord> {
        let url = response.url().to_string();
        let status = response.status();
        let headers = response.headers().clone();
        let charset = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(utils::charset_from_content_type);

        let raw = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                // The status line and headers arrived but the body did not
                warn!(url = %url, error = %e, "failed to read response body");
                let error = if e.is_timeout() {
                    Error::Timeout { url: url.clone() }
                } else {
                    Error::Network(e)
                };
                return Ok(ResponseRecord {
                    url,
                    status: Some(status.as_u16()),
                    headers,
                    charset,
                    error: Some(error),
                    ..ResponseRecord::default()
                });
            }
        };

        let body = if self.config.http.decode_content {
            decoder::decode_body(&headers, raw)?
        } else {
            raw
        };

        let error = if status.is_client_error() || status.is_server_error() {
            Some(Error::Request(format!("HTTP status {status} for {url}")))
        } else {
            None
        };

        Ok(ResponseRecord {
            url,
            status: Some(status.as_u16()),
            headers,
            body,
            charset,
            error,
            history: Vec::new(),
        })
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => warn!(name = %name, "skipping header that is not valid on the wire"),
    }
}

/// Turn a `Location` header value into an absolute URL.
///
/// Scheme-relative targets inherit the scheme of the current URL and
/// absolute targets pass through untouched. Relative targets are
/// re-encoded before joining, so servers that emit raw unicode or
/// spaces in the location still produce a fetchable URL.
fn normalize_location(base: &str, location: &str) -> Result<String> {
    let base_url = Url::parse(base)
        .map_err(|e| Error::Request(format!("cannot resolve redirect from {base}: {e}")))?;

    if let Some(rest) = location.strip_prefix("//") {
        return Ok(format!("{}://{}", base_url.scheme(), rest));
    }

    if let Ok(absolute) = Url::parse(location)
        && absolute.has_host()
    {
        return Ok(location.to_string());
    }

    let joined = base_url
        .join(&requote(location))
        .map_err(|e| Error::Request(format!("invalid redirect target {location}: {e}")))?;
    Ok(joined.to_string())
}

/// Percent-decode a relative location and encode it again.
///
/// Already-encoded input survives the round trip unchanged while raw
/// characters get escaped. The whole value is treated as path text, so
/// a query separator in a relative target is escaped along with
/// everything else. Path separators are kept.
fn requote(value: &str) -> String {
    let decoded = match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    };
    urlencoding::encode(&decoded).replace("%2F", "/")
}
