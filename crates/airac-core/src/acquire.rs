//! Package acquisition
//!
//! Packages are published on an index page per region. The fetcher loads
//! the page, picks the first link matching the region's pattern and
//! downloads it into the download directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use backoff::ExponentialBackoff;
use regex::Regex;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Packages are several MiB; anything smaller is suspicious.
const MIN_EXPECTED_SIZE: usize = 1024 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("Invalid href regex")
});

/// Index page and link pattern of a region's packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSource {
    pub index_url: String,
    /// Regex the absolute package URL must match from its start
    pub link_pattern: String,
}

impl DownloadSource {
    pub fn new(index_url: impl Into<String>, link_pattern: impl Into<String>) -> Self {
        Self {
            index_url: index_url.into(),
            link_pattern: link_pattern.into(),
        }
    }
}

/// A downloaded archive plus anything odd noticed on the way.
#[derive(Debug, Clone)]
pub struct FetchedPackage {
    pub path: PathBuf,
    pub warnings: Vec<String>,
}

/// Retrieves the newest package archive for a region.
pub trait PackageFetcher {
    /// Download into `dest_dir` and return the archive path.
    fn fetch(&self, region: &str, source: &DownloadSource, dest_dir: &Path) -> Result<FetchedPackage>;

    /// Find the package URL without downloading it.
    fn probe(&self, region: &str, source: &DownloadSource) -> Result<String>;
}

/// Blocking HTTP fetcher with retries on transient failures.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    max_elapsed: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            max_elapsed: Duration::from_secs(60),
        })
    }

    /// GET `url` with `Referer`, retrying connection errors and 5xx answers.
    fn get(&self, url: &str, referer: &str) -> Result<reqwest::blocking::Response> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..ExponentialBackoff::default()
        };

        let attempt = || {
            let response = self
                .client
                .get(url)
                .header(header::REFERER, referer)
                .send()
                .map_err(|e| {
                    let error = network(url, e.to_string());
                    if e.is_connect() || e.is_timeout() {
                        tracing::debug!(url, "Transient request failure, retrying");
                        backoff::Error::transient(error)
                    } else {
                        backoff::Error::permanent(error)
                    }
                })?;

            let status = response.status();
            if status.is_server_error() {
                return Err(backoff::Error::transient(network(url, format!("HTTP {}", status))));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(network(url, format!("HTTP {}", status))));
            }
            Ok(response)
        };

        backoff::retry(policy, attempt).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }

    fn find_url(&self, region: &str, source: &DownloadSource) -> Result<String> {
        tracing::info!(region, index = %source.index_url, "Looking up latest package");
        let page = self
            .get(&source.index_url, &source.index_url)?
            .text()
            .map_err(|e| network(&source.index_url, e.to_string()))?;

        find_package_link(&page, &source.index_url, &source.link_pattern)?.ok_or_else(|| {
            Error::resolution(format!(
                "No download link for {} matches '{}' on {}",
                region, source.link_pattern, source.index_url
            ))
        })
    }
}

impl PackageFetcher for HttpFetcher {
    fn fetch(&self, region: &str, source: &DownloadSource, dest_dir: &Path) -> Result<FetchedPackage> {
        let url = self.find_url(region, source)?;
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("package.zip");
        let target = unique_path(&dest_dir.join(file_name));

        tracing::info!(url = %url, target = %target.display(), "Downloading package");
        let response = self.get(&url, &source.index_url)?;
        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("text/html"));
        if is_html {
            return Err(network(&url, "server returned an HTML page instead of an archive"));
        }
        let body = response.bytes().map_err(|e| network(&url, e.to_string()))?;

        let warnings = inspect_body(&body).map_err(|message| network(&url, message))?;
        for warning in &warnings {
            tracing::warn!(url = %url, "{}", warning);
        }

        airac_fs::io::write_atomic(&target, &body)?;
        tracing::info!(bytes = body.len(), "Download complete");
        Ok(FetchedPackage {
            path: target,
            warnings,
        })
    }

    fn probe(&self, region: &str, source: &DownloadSource) -> Result<String> {
        self.find_url(region, source)
    }
}

fn network(url: &str, message: impl Into<String>) -> Error {
    Error::Network {
        url: url.to_string(),
        message: message.into(),
    }
}

/// First link on `page` whose absolute URL matches `pattern` from its start.
///
/// Relative links are resolved against `base`.
pub fn find_package_link(page: &str, base: &str, pattern: &str) -> Result<Option<String>> {
    let matcher = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
        Error::resolution(format!("Invalid link pattern '{}': {}", pattern, e))
    })?;
    let base = Url::parse(base).ok();

    let links = HREF.captures_iter(page).filter_map(|c| c.get(1)).map(|m| {
        let href = m.as_str().trim();
        base.as_ref()
            .and_then(|b| b.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| href.to_string())
    });

    let mut seen = 0;
    for link in links {
        seen += 1;
        if matcher.is_match(&link) {
            tracing::debug!(link = %link, "Package link found");
            return Ok(Some(link));
        }
    }
    tracing::debug!(links = seen, "No link matched");
    Ok(None)
}

/// `dir/name.zip`, or `dir/name-2.zip`, `dir/name-3.zip`, ... if taken.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (2..)
        .map(|n| path.with_file_name(format!("{}-{}{}", stem, n, extension)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Reject HTML bodies; warn about bodies that do not look like a package.
pub fn inspect_body(body: &[u8]) -> std::result::Result<Vec<String>, String> {
    let mut warnings = Vec::new();
    if !body.starts_with(b"PK") {
        let head = String::from_utf8_lossy(&body[..body.len().min(512)]).to_ascii_lowercase();
        if head.contains("<html") || head.contains("<!doctype") {
            return Err("downloaded content is an HTML page, not a ZIP archive".to_string());
        }
        warnings.push("Downloaded file does not start with the ZIP signature".to_string());
    }
    if body.len() < MIN_EXPECTED_SIZE {
        warnings.push(format!(
            "Small download ({} KB) for an AIRAC package",
            body.len() / 1024
        ));
    }
    Ok(warnings)
}
