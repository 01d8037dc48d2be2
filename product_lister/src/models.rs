//! Domain types shared by the pipeline stages

use crate::error::{ListerError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A scanned UPC, digits only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Upc(String);

impl Upc {
    /// Validate UPC text. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ListerError::InvalidUpc(text.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the trailing GTIN check digit (UPC-A is GTIN-12)
    ///
    /// Only meaningful for 8, 12, 13 and 14 digit codes; UPC-E in its
    /// compressed form returns `None`.
    pub fn check_digit_valid(&self) -> Option<bool> {
        if !matches!(self.0.len(), 8 | 12 | 13 | 14) {
            return None;
        }
        let digits: Vec<u32> = self.0.bytes().map(|b| u32::from(b - b'0')).collect();
        let (body, check) = digits.split_at(digits.len() - 1);
        let sum: u32 = body
            .iter()
            .rev()
            .enumerate()
            .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
            .sum();
        Some((10 - sum % 10) % 10 == check[0])
    }
}

impl fmt::Display for Upc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stock keeping unit in the form `YYMMDD-B-NNN`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn new(date: NaiveDate, sequence: u64) -> Self {
        Self(format!("{}-B-{:03}", date.format("%y%m%d"), sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generated product metadata, seven fields in a fixed order
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProductMetadata {
    pub title: String,
    pub description: String,
    pub brand: String,
    pub manufacturer: String,
    pub model_number: String,
    #[serde(deserialize_with = "string_or_number")]
    pub msrp: String,
    pub category: String,
}

/// Models sometimes answer `"msrp": 19.99` instead of `"msrp": "19.99"`
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Where the listing price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    SoldListings,
    Msrp,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSource::SoldListings => write!(f, "sold listings"),
            PriceSource::Msrp => write!(f, "MSRP"),
        }
    }
}

/// Multipliers applied to the sold-price mean and to the MSRP fallback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingPolicy {
    pub sold_factor: f64,
    pub msrp_factor: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            sold_factor: 0.5,
            msrp_factor: 0.5,
        }
    }
}

impl PricingPolicy {
    /// Pick the listing price: sold estimate if present, else MSRP times factor.
    ///
    /// The MSRP must be a plain finite number; currency symbols are not
    /// stripped and `NaN`/`inf` are rejected.
    pub fn select(&self, sold_estimate: Option<f64>, msrp: &str) -> Result<(f64, PriceSource)> {
        if let Some(price) = sold_estimate {
            return Ok((price, PriceSource::SoldListings));
        }
        let msrp_value = msrp
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ListerError::PriceParse(msrp.to_string()))?;
        Ok((msrp_value * self.msrp_factor, PriceSource::Msrp))
    }
}

/// Body of the Sellbrite `POST /products` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPayload {
    pub sku: Sku,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub manufacturer: String,
    pub model_number: String,
    pub price: f64,
    pub category: String,
    pub upc: Upc,
}

impl ListingPayload {
    pub fn new(sku: Sku, metadata: ProductMetadata, price: f64, upc: Upc) -> Self {
        Self {
            sku,
            title: metadata.title,
            description: metadata.description,
            brand: metadata.brand,
            manufacturer: metadata.manufacturer,
            model_number: metadata.model_number,
            price,
            category: metadata.category,
            upc,
        }
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
