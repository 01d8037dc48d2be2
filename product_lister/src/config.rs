//! Runtime configuration and client construction
//!
//! Credentials are read from the environment by the binary and passed in
//! here explicitly; nothing in the library reads environment variables.

use crate::ebay::EbayFinding;
use crate::error::{ListerError, Result};
use crate::models::PricingPolicy;
use crate::openai::{MetadataFormat, OpenAiClient};
use crate::pipeline::ListingPipeline;
use crate::sellbrite::{AuthScheme, SellbriteApi};
use crate::sequence::{
    FileSequenceStore, SequenceStore, SkuMinter, SqliteSequenceStore, DEFAULT_COUNTER_FILE,
};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which counter store backs SKU minting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterBackend {
    /// Plain-text file, no locking
    #[default]
    File,
    /// SQLite row updated in a transaction
    Sqlite,
}

impl FromStr for CounterBackend {
    type Err = ListerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(CounterBackend::File),
            "sqlite" => Ok(CounterBackend::Sqlite),
            other => Err(ListerError::Config(format!(
                "unknown counter store {other:?} (expected file or sqlite)"
            ))),
        }
    }
}

/// API credentials; `Debug` only shows whether each one is set
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub ebay_app_id: Option<String>,
    pub sellbrite_api_key: Option<String>,
    pub sellbrite_api_secret: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |value: &Option<String>| if value.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("openai_api_key", &state(&self.openai_api_key))
            .field("ebay_app_id", &state(&self.ebay_app_id))
            .field("sellbrite_api_key", &state(&self.sellbrite_api_key))
            .field("sellbrite_api_secret", &state(&self.sellbrite_api_secret))
            .finish()
    }
}

/// Resolved settings for one process
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub credentials: Credentials,
    pub counter_backend: CounterBackend,
    pub counter_path: Option<PathBuf>,
    pub metadata_format: MetadataFormat,
    pub openai_model: Option<String>,
    pub auth_scheme: AuthScheme,
    pub policy: PricingPolicy,
    pub http_timeout: Option<Duration>,
    pub openai_base_url: Option<String>,
    pub ebay_base_url: Option<String>,
    pub sellbrite_base_url: Option<String>,
}

/// Treat blank values the same as missing ones
fn required(value: &Option<String>, env_name: &str, missing: &mut Vec<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(env_name.to_string());
            String::new()
        }
    }
}

impl Config {
    /// Counter location, falling back to the backend's default
    ///
    /// - file: `sequential_number.txt` in the working directory
    /// - sqlite: `<data dir>/product_lister/sequence.db`
    pub fn counter_path(&self) -> PathBuf {
        if let Some(path) = &self.counter_path {
            return path.clone();
        }
        match self.counter_backend {
            CounterBackend::File => PathBuf::from(DEFAULT_COUNTER_FILE),
            CounterBackend::Sqlite => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("product_lister")
                .join("sequence.db"),
        }
    }

    /// Open the configured counter store
    pub fn open_sequence_store(&self) -> Result<Box<dyn SequenceStore>> {
        let path = self.counter_path();
        log::debug!("Counter store: {:?} at {}", self.counter_backend, path.display());
        Ok(match self.counter_backend {
            CounterBackend::File => Box::new(FileSequenceStore::new(path)),
            CounterBackend::Sqlite => Box::new(SqliteSequenceStore::open(path)?),
        })
    }

    /// Check the pricing factors are usable
    pub fn validate_policy(&self) -> Result<()> {
        for (name, factor) in [
            ("sold factor", self.policy.sold_factor),
            ("MSRP factor", self.policy.msrp_factor),
        ] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(ListerError::Config(format!(
                    "{name} must be a positive number, got {factor}"
                )));
            }
        }
        Ok(())
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent("product_lister/1.0");
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    /// Build every collaborator and the pipeline around them
    ///
    /// Fails with `ListerError::Config` naming each missing credential.
    pub fn build_pipeline(&self) -> Result<ListingPipeline> {
        self.validate_policy()?;

        let creds = &self.credentials;
        let mut missing = Vec::new();
        let openai_key = required(&creds.openai_api_key, "OPENAI_API_KEY", &mut missing);
        let ebay_app_id = required(&creds.ebay_app_id, "EBAY_APP_ID", &mut missing);
        let sellbrite_key = required(&creds.sellbrite_api_key, "SELLBRITE_API_KEY", &mut missing);
        let sellbrite_secret =
            required(&creds.sellbrite_api_secret, "SELLBRITE_API_SECRET", &mut missing);
        if !missing.is_empty() {
            return Err(ListerError::Config(format!(
                "missing credentials: {}",
                missing.join(", ")
            )));
        }

        let client = self.http_client()?;

        let mut prices = EbayFinding::new(client.clone(), ebay_app_id);
        if let Some(url) = &self.ebay_base_url {
            prices = prices.with_base_url(url.clone());
        }

        let mut metadata = OpenAiClient::new(client.clone(), openai_key, self.metadata_format);
        if let Some(model) = &self.openai_model {
            metadata = metadata.with_model(model.clone());
        }
        if let Some(url) = &self.openai_base_url {
            metadata = metadata.with_base_url(url.clone());
        }

        let mut publisher = SellbriteApi::new(client, sellbrite_key, sellbrite_secret)
            .with_auth_scheme(self.auth_scheme);
        if let Some(url) = &self.sellbrite_base_url {
            publisher = publisher.with_base_url(url.clone());
        }

        let minter = SkuMinter::new(self.open_sequence_store()?);

        Ok(ListingPipeline::new(
            minter, prices, metadata, publisher, self.policy,
        ))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
