//! Sellbrite API client for creating products

use crate::error::Result;
use crate::models::ListingPayload;
use base64::Engine;
use reqwest::StatusCode;

/// Sellbrite REST API root
pub const SELLBRITE_API_URL: &str = "https://api.sellbrite.com/v1";

/// How the API key and secret go into the `Authorization` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Basic base64(key:secret)`
    #[default]
    Basic,
    /// `Basic key:secret` without encoding, as older scripts sent it
    LegacyConcatenated,
}

/// Result of a create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created,
    Rejected { status: StatusCode, body: String },
}

impl PublishOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, PublishOutcome::Created)
    }
}

/// Sellbrite API client
pub struct SellbriteApi {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) api_secret: String,
    pub(crate) base_url: String,
    pub(crate) auth_scheme: AuthScheme,
}

impl SellbriteApi {
    /// Creates a new Sellbrite client with the given credentials.
    pub fn new(client: reqwest::Client, api_key: String, api_secret: String) -> Self {
        log::debug!(
            "Creating Sellbrite client (key length: {}, secret length: {})",
            api_key.len(),
            api_secret.len()
        );
        Self {
            client,
            api_key,
            api_secret,
            base_url: SELLBRITE_API_URL.to_string(),
            auth_scheme: AuthScheme::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_scheme(mut self, auth_scheme: AuthScheme) -> Self {
        self.auth_scheme = auth_scheme;
        self
    }

    /// Value of the `Authorization` header
    pub(crate) fn authorization(&self) -> String {
        match self.auth_scheme {
            AuthScheme::Basic => {
                let credentials = format!("{}:{}", self.api_key, self.api_secret);
                format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(credentials)
                )
            }
            AuthScheme::LegacyConcatenated => {
                format!("Basic {}:{}", self.api_key, self.api_secret)
            }
        }
    }

    /// POST the listing to `/products`; only `201 Created` counts as success.
    ///
    /// A rejection is returned as `PublishOutcome::Rejected`, not as an error,
    /// and is never retried.
    pub async fn create_product(&self, payload: &ListingPayload) -> Result<PublishOutcome> {
        let url = format!("{}/products", self.base_url);
        log::info!("Creating Sellbrite product {} ({})", payload.sku, payload.title);
        log::debug!("POST {} with price {:.2}", url, payload.price);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", self.authorization())
            .body(serde_json::to_vec(payload)?)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            log::info!("Sellbrite created product {}", payload.sku);
            return Ok(PublishOutcome::Created);
        }

        let body = response.text().await.unwrap_or_default();
        log::error!("Sellbrite rejected product {} with status {}: {}", payload.sku, status, body);
        Ok(PublishOutcome::Rejected { status, body })
    }
}

#[cfg(test)]
#[path = "sellbrite_tests.rs"]
mod tests;
