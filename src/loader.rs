use crate::config::CacheConfig;
use moka::future::Cache;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a resource could not be fetched. Callers treat every variant the
/// same way: log it and carry on without the resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} timed out")]
    Timeout { url: String },
}

/// Fetches text resources over HTTP with a page-lifetime cache keyed by
/// the exact URL string, query parameters included. Entries are never
/// invalidated; cache busting works by varying the query string.
pub struct ResourceLoader {
    client: Client,
    cache: Cache<Arc<str>, Arc<str>>,
    cache_enabled: bool,
}

impl ResourceLoader {
    pub fn new(cache: &CacheConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("SiteStyler/1.0")
            .timeout(timeout)
            .build()
            .unwrap();
        Self {
            client,
            cache: Cache::builder().max_capacity(cache.capacity).build(),
            cache_enabled: cache.enable,
        }
    }

    /// Fetches a resource, consulting the cache unless `bypass_cache` is
    /// set. Bypassed fetches never populate the cache either, so a fresh
    /// read stays fresh on the next non-bypassed fetch.
    pub async fn fetch(&self, url: &str, bypass_cache: bool) -> Result<Arc<str>, FetchError> {
        let key: Arc<str> = Arc::from(url);
        let use_cache = self.cache_enabled && !bypass_cache;

        if use_cache {
            if let Some(text) = self.cache.get(&key).await {
                debug!("Cache hit: {}", url);
                return Ok(text);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| classify(url, e))?;
        let text: Arc<str> = Arc::from(text.as_str());

        if use_cache {
            self.cache.insert(key, text.clone()).await;
        }
        Ok(text)
    }

    /// Failure-tolerant variant: absence is "skip this resource".
    pub async fn fetch_ok(&self, url: &str, bypass_cache: bool) -> Option<Arc<str>> {
        match self.fetch(url, bypass_cache).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            source: err,
        }
    }
}
