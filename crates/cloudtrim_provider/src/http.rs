//! HTTP price catalog client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::api::{PriceCatalogApi, PriceQuery};
use crate::error::{ProviderError, ProviderResult};

/// Price catalog response body.
#[derive(Debug, Deserialize)]
struct PriceListResponse {
    #[serde(rename = "PriceList", default)]
    price_list: Vec<String>,
}

/// Price catalog reached over HTTP.
///
/// The query is POSTed as JSON to `endpoint`; the response carries the raw
/// price documents under `PriceList`.
pub struct HttpPriceCatalog {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpPriceCatalog {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send `key` as a bearer token with each request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PriceCatalogApi for HttpPriceCatalog {
    async fn get_products(&self, query: &PriceQuery) -> ProviderResult<Vec<String>> {
        debug!("Querying price catalog at {}", self.endpoint);

        let mut request = self.client.post(&self.endpoint).json(query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: PriceListResponse = response.json().await?;
        Ok(body.price_list)
    }
}

/// Map a non-success catalog response to a provider error.
fn status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let body = body.trim();
    if body.is_empty() {
        ProviderError::api("pricing", status.to_string())
    } else {
        ProviderError::api("pricing", format!("{} - {}", status, body))
    }
}
