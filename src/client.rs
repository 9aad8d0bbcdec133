use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, Proxy, redirect};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::data_models::SearchType;
use crate::error::{Result, ScrapeError};

pub const DEFAULT_BASE_URL: &str = "https://github.com";
pub const DEFAULT_CONCURRENCY: usize = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-GB,en-US;q=0.9,en;q=0.8";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:125.0) Gecko/20100101 Firefox/125.0";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub concurrency: usize,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> ClientConfig {
        ClientConfig {
            base_url: CONFIG.base_url.trim_end_matches('/').to_string(),
            concurrency: CONFIG.concurrency,
            timeout: Duration::from_secs(CONFIG.timeout_secs),
            max_attempts: CONFIG.max_attempts,
            backoff_base: Duration::from_millis(CONFIG.backoff_ms),
        }
    }
}

/// Fetches pages from the site through a forward proxy.
///
/// Every call opens its own connection. The gate bounds how many calls are
/// in flight at once across all clones of this client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    config: ClientConfig,
    gate: Arc<Semaphore>,
}

impl GithubClient {
    pub fn new(config: ClientConfig) -> GithubClient {
        // a zero-sized gate would never admit anything
        let permits = config.concurrency.max(1);
        GithubClient {
            config,
            gate: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn search_endpoint(&self) -> String {
        format!("{}/search", self.config.base_url)
    }

    pub async fn get_search_results_page(
        &self,
        query: &str,
        search_type: SearchType,
        proxy: &str,
    ) -> Result<String> {
        let endpoint = self.search_endpoint();
        let params = [("q", query), ("type", search_type.as_query_value())];
        self.perform_request(Method::GET, &endpoint, proxy, Some(&params[..]))
            .await
    }

    pub async fn get_repository_page(&self, repo_url: &str, proxy: &str) -> Result<String> {
        self.perform_request(Method::GET, repo_url, proxy, None).await
    }

    async fn perform_request(
        &self,
        method: Method,
        url: &str,
        proxy: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<String> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.request_once(method.clone(), url, proxy, params).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = fibonacci_backoff(self.config.backoff_base, attempt);
                    warn!(
                        "attempt {attempt}/{max_attempts} for {url} failed: {e:#}, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        proxy: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<String> {
        let _permit = self
            .gate
            .acquire()
            .await
            .expect("gate semaphore is never closed");

        let client = self.build_http_client(proxy)?;
        let mut request = client.request(method, url);
        if let Some(params) = params {
            request = request.query(params);
        }

        debug!("requesting {url} via {proxy}");
        let network = |source| ScrapeError::Network {
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: response.url().to_string(),
                status,
            });
        }
        response.text().await.map_err(network)
    }

    fn build_http_client(&self, proxy: &str) -> Result<reqwest::Client> {
        let proxy_url = normalize_proxy(proxy);
        let proxy_err = |source| ScrapeError::Proxy {
            proxy: proxy_url.clone(),
            source,
        };
        let proxy = Proxy::all(&proxy_url).map_err(proxy_err)?;

        reqwest::Client::builder()
            .default_headers(default_headers())
            .proxy(proxy)
            .timeout(self.config.timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(proxy_err)
    }
}

/// Browser-like headers sent with every request.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers
}

/// Prepends `http://` to a proxy given without a scheme. The result is used
/// for both plain and TLS traffic.
pub fn normalize_proxy(proxy: &str) -> String {
    let proxy = proxy.trim();
    if proxy.contains("://") {
        proxy.to_string()
    } else {
        format!("http://{proxy}")
    }
}

/// Full-jitter delay before the attempt following `attempt`, drawn from
/// `[0, fib(attempt) * base]` with `fib = 1, 1, 2, 3, 5, ...`.
pub fn fibonacci_backoff(base: Duration, attempt: u32) -> Duration {
    let ceiling = base.saturating_mul(fibonacci(attempt));
    let millis = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(fastrand::u64(0..=millis))
}

fn fibonacci(n: u32) -> u32 {
    let (mut a, mut b) = (1u32, 1u32);
    for _ in 1..n {
        (a, b) = (b, a.saturating_add(b));
    }
    a
}
