//! HTTP fetcher implementation
//!
//! This module handles all requests to the catalog, including:
//! - Building one HTTP client with a fixed identity for the whole run
//! - Fetching a record page by identifier
//! - Classifying the response as found, not found, timed out, or failed
//!
//! Nothing here retries. A failed identifier is simply not a record.

use crate::config::{CatalogConfig, Config, IdentityConfig, ID_PLACEHOLDER};
use crate::{ConfigError, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Success status and a body that is not the catalog's "not found" page
    Found(String),

    /// Non-success status, or a success status serving the "not found" page
    NotFound {
        /// The HTTP status code
        status: u16,
    },

    /// The request exceeded the per-request timeout
    TimedOut,

    /// Any other transport failure (connect, DNS, body decode)
    TransportError(String),
}

/// Source of record pages keyed by identifier
///
/// Implemented by [`HttpFetcher`] for live runs and by [`FixtureFetcher`] for
/// network-free runs.
pub trait Fetcher {
    fn fetch(&self, id: u64) -> impl Future<Output = FetchResult>;
}

/// Builds an HTTP client carrying the run's identity
///
/// The identity headers and the cookie jar live in the client, so every request
/// of a run presents as the same browser session.
///
/// # Arguments
///
/// * `identity` - Headers sent with every request
/// * `timeout` - Total per-request timeout
pub fn build_http_client(
    identity: &IdentityConfig,
    timeout: Duration,
) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        header_value("accept_language", &identity.accept_language)?,
    );
    if let Some(referer) = &identity.referer {
        headers.insert(REFERER, header_value("referer", referer)?);
    }

    let client = Client::builder()
        .user_agent(identity.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HarvestError> {
    HeaderValue::from_str(value).map_err(|e| {
        HarvestError::Config(ConfigError::Validation(format!(
            "{} is not a valid header value: {}",
            name, e
        )))
    })
}

/// Live fetcher against the catalog's record pages
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url_template: String,
    not_found_marker: String,
}

impl HttpFetcher {
    pub fn new(client: Client, catalog: &CatalogConfig) -> Self {
        Self {
            client,
            url_template: catalog.url_template.clone(),
            not_found_marker: catalog.not_found_marker.clone(),
        }
    }

    /// Builds the client and fetcher described by `config`
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.identity, config.harvest.request_timeout())?;
        Ok(Self::new(client, &config.catalog))
    }

    /// Record page URL for `id`
    pub fn url_for(&self, id: u64) -> String {
        self.url_template.replace(ID_PLACEHOLDER, &id.to_string())
    }

    /// Classifies a transport failure
    fn classify_error(error: reqwest::Error) -> FetchResult {
        if error.is_timeout() {
            FetchResult::TimedOut
        } else if error.is_connect() {
            FetchResult::TransportError(format!("Connection failed: {}", error))
        } else {
            FetchResult::TransportError(error.to_string())
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, id: u64) -> FetchResult {
        let url = self.url_for(id);
        tracing::debug!("Fetching {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return Self::classify_error(e),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::NotFound {
                status: status.as_u16(),
            };
        }

        match response.text().await {
            Ok(body) if body.contains(&self.not_found_marker) => FetchResult::NotFound {
                status: status.as_u16(),
            },
            Ok(body) => FetchResult::Found(body),
            Err(e) => Self::classify_error(e),
        }
    }
}

/// Fetcher that replays recorded responses
///
/// Identifiers without a recorded response answer `NotFound { status: 404 }`.
/// Every requested identifier is remembered, in order, so callers can check
/// exactly what a run fetched.
#[derive(Debug, Default)]
pub struct FixtureFetcher {
    responses: HashMap<u64, FetchResult>,
    requested: Mutex<Vec<u64>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the response for `id`
    pub fn with_response(mut self, id: u64, result: FetchResult) -> Self {
        self.responses.insert(id, result);
        self
    }

    /// Records a found page for every `(id, body)` pair
    pub fn with_pages<I>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        for (id, body) in pages {
            self.responses.insert(id, FetchResult::Found(body));
        }
        self
    }

    /// Identifiers fetched so far, in request order
    pub fn requested(&self) -> Vec<u64> {
        self.requested
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

impl Fetcher for FixtureFetcher {
    async fn fetch(&self, id: u64) -> FetchResult {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(id);
        }
        self.responses
            .get(&id)
            .cloned()
            .unwrap_or(FetchResult::NotFound { status: 404 })
    }
}
