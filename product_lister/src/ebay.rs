//! eBay Finding API client for sold-listing price estimates
//!
//! Uses `findCompletedItems` with the JSON response format. Every element in
//! that format is wrapped in an array, so the structs below mirror it.

use crate::error::{ListerError, Result};
use crate::models::Upc;
use serde::Deserialize;

/// eBay FindingService endpoint
pub const FINDING_API_URL: &str = "https://svcs.ebay.com/services/search/FindingService/v1";

/// Results requested per search; only the first page is used
const ENTRIES_PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct FindingEnvelope {
    #[serde(rename = "findCompletedItemsResponse")]
    responses: Vec<FindCompletedItemsResponse>,
}

#[derive(Debug, Deserialize)]
struct FindCompletedItemsResponse {
    #[serde(default)]
    ack: Vec<String>,
    #[serde(rename = "searchResult", default)]
    search_result: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    item: Vec<SoldItem>,
}

#[derive(Debug, Deserialize)]
struct SoldItem {
    #[serde(rename = "sellingStatus")]
    selling_status: Vec<SellingStatus>,
}

#[derive(Debug, Deserialize)]
struct SellingStatus {
    #[serde(rename = "currentPrice")]
    current_price: Vec<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    #[serde(rename = "__value__")]
    value: String,
}

/// Client for the eBay Finding API
pub struct EbayFinding {
    pub(crate) client: reqwest::Client,
    pub(crate) app_id: String,
    pub(crate) base_url: String,
    pub(crate) global_id: String,
}

impl EbayFinding {
    /// Creates a client for the US marketplace with the given App ID.
    pub fn new(client: reqwest::Client, app_id: String) -> Self {
        log::debug!("Creating eBay Finding client (app id length: {})", app_id.len());
        Self {
            client,
            app_id,
            base_url: FINDING_API_URL.to_string(),
            global_id: "EBAY-US".to_string(),
        }
    }

    /// Overrides the endpoint (mock servers, sandbox)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the sold prices of used, completed listings matching the UPC
    pub async fn sold_prices(&self, upc: &Upc) -> Result<Vec<f64>> {
        let keywords = format!("UPC:{upc}");
        let params = [
            ("OPERATION-NAME", "findCompletedItems"),
            ("SERVICE-VERSION", "1.0.0"),
            ("SECURITY-APPNAME", self.app_id.as_str()),
            ("GLOBAL-ID", self.global_id.as_str()),
            ("RESPONSE-DATA-FORMAT", "JSON"),
            ("REST-PAYLOAD", ""),
            ("itemFilter(0).name", "Condition"),
            ("itemFilter(0).value", "Used"),
            ("itemFilter(1).name", "SoldItemsOnly"),
            ("itemFilter(1).value", "true"),
            ("itemFilter(2).name", "HideDuplicateItems"),
            ("itemFilter(2).value", "true"),
            ("keywords", keywords.as_str()),
            ("paginationInput.entriesPerPage", ENTRIES_PER_PAGE),
        ];

        log::info!("Searching eBay sold listings for UPC {}", upc);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("eBay search failed with status {}: {}", status, body);
            return Err(ListerError::HttpStatus { status, body });
        }

        let body = response.text().await?;
        let prices = parse_sold_prices(&body)?;
        log::info!("Found {} sold listing(s) for UPC {}", prices.len(), upc);
        Ok(prices)
    }

    /// Sold-price mean times `factor`, or `None` when nothing sold
    pub async fn estimate_price(&self, upc: &Upc, factor: f64) -> Result<Option<f64>> {
        let prices = self.sold_prices(upc).await?;
        Ok(estimate_from_sold(&prices, factor))
    }
}

/// Extract every item's sold price from a `findCompletedItems` JSON body
///
/// Any item without a readable price fails the whole document.
pub fn parse_sold_prices(body: &str) -> Result<Vec<f64>> {
    let envelope: FindingEnvelope = serde_json::from_str(body)
        .map_err(|e| ListerError::MalformedResponse(format!("eBay search response: {e}")))?;

    let response = envelope.responses.first().ok_or_else(|| {
        ListerError::MalformedResponse("eBay search response is empty".to_string())
    })?;

    if let Some(ack) = response.ack.first() {
        // A failed call (bad App ID, throttling) must not read as "nothing sold"
        if ack == "Failure" && response.search_result.is_empty() {
            return Err(ListerError::MalformedResponse(
                "eBay search acknowledged with Failure".to_string(),
            ));
        }
        if ack != "Success" {
            log::warn!("eBay search acknowledged with {}", ack);
        }
    }

    response
        .search_result
        .iter()
        .flat_map(|result| result.item.iter())
        .enumerate()
        .map(|(index, item)| item_price(index, item))
        .collect()
}

fn item_price(index: usize, item: &SoldItem) -> Result<f64> {
    let raw = item
        .selling_status
        .first()
        .and_then(|status| status.current_price.first())
        .map(|amount| amount.value.as_str())
        .ok_or_else(|| {
            ListerError::MalformedResponse(format!("item {index} has no sold price"))
        })?;

    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
        .ok_or_else(|| {
            ListerError::MalformedResponse(format!("item {index} has unreadable price {raw:?}"))
        })
}

/// Mean of `prices` times `factor`; `None` for an empty slice
pub fn estimate_from_sold(prices: &[f64], factor: f64) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    Some(mean * factor)
}

#[cfg(test)]
#[path = "ebay_tests.rs"]
mod tests;
