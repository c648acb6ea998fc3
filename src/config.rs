//! Configuration types for parfetch

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Top-level configuration for the fetch client and both engines
///
/// Fields are organized into logical sub-configs:
/// - [`http`](HttpConfig) - headers, proxies, timeout, content decoding
/// - [`redirect`](RedirectConfig) - redirect following and hop budget
/// - [`batch`](BatchConfig) - worker pool sizing
/// - [`segment`](SegmentConfig) - segmented download behavior
///
/// All sub-config fields are flattened for serialization, so a config file
/// stays a single flat object with no nesting. The client captures the value
/// at construction; later mutations of the caller's copy have no effect on an
/// already-built client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP transport settings (headers, proxies, timeout, decoding)
    #[serde(flatten)]
    pub http: HttpConfig,

    /// Redirect resolution settings
    #[serde(flatten)]
    pub redirect: RedirectConfig,

    /// Batch fetch engine settings
    #[serde(flatten)]
    pub batch: BatchConfig,

    /// Segmented downloader settings
    #[serde(flatten)]
    pub segment: SegmentConfig,
}

// Convenience accessors for the settings callers reach for most often.
impl Config {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.http.timeout
    }

    /// Directory segmented downloads are written to
    pub fn output_dir(&self) -> &PathBuf {
        &self.segment.output_dir
    }

    /// Reject settings no engine can run with
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout.is_zero() {
            return Err(Error::Config {
                message: "timeout must be greater than zero".into(),
                key: Some("timeout".into()),
            });
        }
        if self.redirect.max_redirects == 0 {
            return Err(Error::Config {
                message: "max_redirects must be at least 1".into(),
                key: Some("max_redirects".into()),
            });
        }
        if self.batch.worker_count == 0 {
            return Err(Error::Config {
                message: "worker_count must be at least 1".into(),
                key: Some("worker_count".into()),
            });
        }
        if self.segment.segment_count == 0 {
            return Err(Error::Config {
                message: "segment_count must be at least 1".into(),
                key: Some("segment_count".into()),
            });
        }
        Ok(())
    }
}

/// HTTP transport configuration (headers, proxies, timeout, decoding)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Headers attached to every request unless overridden per call
    #[serde(default = "default_headers")]
    pub default_headers: HashMap<String, String>,

    /// Proxy URL per scheme (e.g. "http" -> "http://127.0.0.1:8080")
    ///
    /// Only consulted when `use_proxy` is set. A malformed entry is logged and
    /// skipped; requests then go out unproxied.
    #[serde(default = "default_proxies")]
    pub proxies: HashMap<String, String>,

    /// Route requests through the configured proxies
    #[serde(default)]
    pub use_proxy: bool,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Transparently decompress gzip/deflate/bzip2 response bodies (default: true)
    #[serde(default = "default_true")]
    pub decode_content: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            default_headers: default_headers(),
            proxies: default_proxies(),
            use_proxy: false,
            timeout: default_timeout(),
            decode_content: true,
        }
    }
}

/// Redirect resolution configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Follow redirect responses (default: true)
    ///
    /// 303 See Other is followed even when this is off.
    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// Maximum redirect hops before a chain is abandoned (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            max_redirects: default_max_redirects(),
        }
    }
}

/// Batch fetch engine configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of concurrent fetch workers (default: 4)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
        }
    }
}

/// Segmented downloader configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Number of byte-range segments per download (default: 2)
    #[serde(default = "default_segment_count")]
    pub segment_count: usize,

    /// Directory the output file and its temp segments are written to (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Permitted discrepancy in bytes between expected and assembled size (default: 10)
    ///
    /// Reassembly fails when the absolute difference exceeds this value.
    #[serde(default = "default_size_tolerance")]
    pub size_tolerance: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            segment_count: default_segment_count(),
            output_dir: default_output_dir(),
            size_tolerance: default_size_tolerance(),
        }
    }
}

// Default value functions
fn default_headers() -> HashMap<String, String> {
    HashMap::from([
        (
            "User-Agent".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_9_4) AppleWebKit/537.77.4 \
             (KHTML, like Gecko) Version/7.0.5 Safari/537.77.4"
                .to_string(),
        ),
        ("Accept-Encoding".to_string(), "gzip, deflate".to_string()),
        ("Accept".to_string(), "*/*".to_string()),
    ])
}

fn default_proxies() -> HashMap<String, String> {
    HashMap::from([("http".to_string(), "http://127.0.0.1:8080".to_string())])
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> usize {
    10
}

fn default_worker_count() -> usize {
    4
}

fn default_segment_count() -> usize {
    2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_size_tolerance() -> u64 {
    10
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
