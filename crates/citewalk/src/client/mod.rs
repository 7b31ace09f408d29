//! Catalog metadata client.
//!
//! Provides the fetch/cache collaborator the engine hydrates publication
//! records through:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - Polite per-request delay
//! - Response caching with TTL (idempotent, cache-coherent hydration)

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{EngineConfig, defaults};
use crate::error::{FetchError, FetchResult};
use crate::models::{Doi, RawRecord};

/// The contract the engine needs from the metadata source: hand back a
/// full record for a DOI, repeatably and without side effects.
#[async_trait::async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch the metadata record for one work.
    async fn hydrate(&self, doi: &Doi) -> FetchResult<RawRecord>;
}

/// HTTP catalog client implementing [`MetadataFetcher`].
#[derive(Clone)]
pub struct CatalogClient {
    /// HTTP client with retry middleware.
    client: ClientWithMiddleware,

    /// Response cache keyed by normalized DOI.
    cache: Cache<String, serde_json::Value>,

    /// Catalog API base URL.
    catalog_api_url: String,

    /// Polite delay before each request.
    rate_limit_delay: Duration,
}

impl CatalogClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "application/json".parse().expect("valid accept header"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(defaults::MAX_KEEPALIVE)
            .pool_idle_timeout(defaults::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(3);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = Cache::builder()
            .max_capacity(config.cache_max_size)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            client,
            cache,
            catalog_api_url: config.catalog_api_url.clone(),
            rate_limit_delay: config.rate_limit_delay,
        })
    }

    /// Fetch one work record, going through the response cache.
    async fn get_work(&self, doi: &Doi) -> FetchResult<RawRecord> {
        let cache_key = doi.as_str().to_string();
        if let Some(cached) = self.cache.get(&cache_key).await {
            return serde_json::from_value(cached).map_err(FetchError::from);
        }

        // Polite delay
        tokio::time::sleep(self.rate_limit_delay).await;

        let url = format!("{}/works/{}", self.catalog_api_url, doi);
        let response = self.client.get(&url).send().await?;
        let response = self.handle_response(doi, response).await?;
        let value: serde_json::Value = response.json().await?;

        self.cache.insert(cache_key, value.clone()).await;

        serde_json::from_value(value).map_err(FetchError::from)
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        doi: &Doi,
        response: reqwest::Response,
    ) -> FetchResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(FetchError::rate_limited(retry_after))
            }
            404 => Err(FetchError::not_found(doi.as_str())),
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(FetchError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(FetchError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }
}

#[async_trait::async_trait]
impl MetadataFetcher for CatalogClient {
    async fn hydrate(&self, doi: &Doi) -> FetchResult<RawRecord> {
        self.get_work(doi).await
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient").field("catalog_api_url", &self.catalog_api_url).finish()
    }
}
