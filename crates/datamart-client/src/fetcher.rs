use datamart_core::config::HttpConfig;
use datamart_core::error::AppError;
use datamart_core::models::ScrapeResult;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::extract::extract;

/// HTTP client that downloads third-party pages for scraping.
///
/// Presents a desktop-browser user agent, follows a bounded number of
/// redirects, and tolerates broken TLS setups on target sites. Any failure
/// is reported as [`AppError::FetchFailed`]; nothing is retried.
///
/// # Examples
///
/// ```no_run
/// use datamart_client::PageFetcher;
/// use datamart_core::HttpConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = PageFetcher::new(&HttpConfig::default())?;
/// let result = fetcher.scrape("https://example.com/stats").await?;
/// println!("Found {} components", result.components.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    timeout_secs: u64,
}

impl PageFetcher {
    /// Creates a fetcher from the given HTTP configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Generic` if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| AppError::Generic(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    /// Parses a scrape target, accepting only absolute http(s) URLs.
    ///
    /// # Examples
    ///
    /// ```
    /// use datamart_client::PageFetcher;
    ///
    /// assert!(PageFetcher::parse_target("https://example.com/a").is_ok());
    /// assert!(PageFetcher::parse_target("example.com").is_err());
    /// assert!(PageFetcher::parse_target("ftp://example.com").is_err());
    /// ```
    pub fn parse_target(url: &str) -> Result<Url, AppError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(AppError::ValidationError("url is required".to_string()));
        }
        let parsed = Url::parse(trimmed)
            .map_err(|e| AppError::ValidationError(format!("invalid url '{}': {}", trimmed, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(AppError::ValidationError(format!(
                "unsupported url scheme '{}'",
                scheme
            ))),
        }
    }

    /// Downloads the raw HTML of a page.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ValidationError` for malformed URLs and
    /// `AppError::FetchFailed` for network errors, timeouts, redirect loops
    /// and non-2xx responses.
    pub async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let target = Self::parse_target(url)?;

        let resp = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| self.fetch_failed(&target, &e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Fetching {} returned HTTP {}", target, status.as_u16());
            return Err(AppError::FetchFailed {
                url: target.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        resp.text().await.map_err(|e| self.fetch_failed(&target, &e))
    }

    /// Fetches a page and extracts its tables and links.
    pub async fn scrape(&self, url: &str) -> Result<ScrapeResult, AppError> {
        let html = self.fetch(url).await?;
        let result = extract(&html);
        info!(
            "Scraped {}: {} component(s), title '{}'",
            url.trim(),
            result.components.len(),
            result.page_title
        );
        Ok(result)
    }

    fn fetch_failed(&self, url: &Url, e: &reqwest::Error) -> AppError {
        let reason = if e.is_timeout() {
            format!("request timed out after {}s", self.timeout_secs)
        } else if e.is_redirect() {
            "too many redirects".to_string()
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            e.to_string()
        };
        warn!("Fetching {} failed: {}", url, reason);
        AppError::FetchFailed {
            url: url.to_string(),
            reason,
        }
    }
}
