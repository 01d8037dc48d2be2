//! The listing pipeline: mint SKU, estimate price, generate metadata, publish
//!
//! Stages run strictly one after another. A failure at any stage aborts the
//! run; the counter increment from `Minting` is not rolled back, so a failed
//! run still spends one SKU.

use crate::ebay::EbayFinding;
use crate::error::Result;
use crate::models::{ListingPayload, PriceSource, PricingPolicy, Sku, Upc};
use crate::openai::OpenAiClient;
use crate::sellbrite::{PublishOutcome, SellbriteApi};
use crate::sequence::SkuMinter;
use chrono::{Local, NaiveDate};
use std::fmt;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Acquiring,
    Minting,
    Estimating,
    Generating,
    Publishing,
    Published,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Acquiring => "acquiring barcode",
            Stage::Minting => "minting SKU",
            Stage::Estimating => "estimating price",
            Stage::Generating => "generating metadata",
            Stage::Publishing => "publishing",
            Stage::Published => "published",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks stage transitions and logs each one
#[derive(Debug)]
pub struct StageTracker {
    current: Stage,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            current: Stage::Idle,
        }
    }
}

impl StageTracker {
    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn enter(&mut self, next: Stage) {
        log::info!("[{}] -> [{}]", self.current, next);
        self.current = next;
    }
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct ListingReport {
    pub payload: ListingPayload,
    pub price_source: PriceSource,
    pub outcome: PublishOutcome,
}

impl ListingReport {
    pub fn sku(&self) -> &Sku {
        &self.payload.sku
    }

    pub fn price(&self) -> f64 {
        self.payload.price
    }
}

/// The external collaborators of one listing run
pub struct ListingPipeline {
    minter: SkuMinter,
    prices: EbayFinding,
    metadata: OpenAiClient,
    publisher: SellbriteApi,
    policy: PricingPolicy,
}

impl ListingPipeline {
    pub fn new(
        minter: SkuMinter,
        prices: EbayFinding,
        metadata: OpenAiClient,
        publisher: SellbriteApi,
        policy: PricingPolicy,
    ) -> Self {
        Self {
            minter,
            prices,
            metadata,
            publisher,
            policy,
        }
    }

    /// Run every stage after acquisition for `upc`, dated today
    pub async fn run(&self, upc: &Upc) -> Result<ListingReport> {
        self.run_on(upc, Local::now().date_naive()).await
    }

    /// Same as `run` with an explicit SKU date
    pub async fn run_on(&self, upc: &Upc, date: NaiveDate) -> Result<ListingReport> {
        let mut tracker = StageTracker::default();
        let mut minted: Option<Sku> = None;

        match self.run_stages(upc, date, &mut tracker, &mut minted).await {
            Ok(report) => {
                tracker.enter(if report.outcome.is_created() {
                    Stage::Published
                } else {
                    Stage::Failed
                });
                Ok(report)
            }
            Err(e) => {
                log::error!("Listing for UPC {} failed while {}: {}", upc, tracker.current(), e);
                if let Some(sku) = minted {
                    log::warn!("SKU {} was spent by the failed run", sku);
                }
                tracker.enter(Stage::Failed);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        upc: &Upc,
        date: NaiveDate,
        tracker: &mut StageTracker,
        minted: &mut Option<Sku>,
    ) -> Result<ListingReport> {
        tracker.enter(Stage::Minting);
        let sku = self.minter.next(date)?;
        *minted = Some(sku.clone());

        tracker.enter(Stage::Estimating);
        let sold_estimate = self.prices.estimate_price(upc, self.policy.sold_factor).await?;
        match sold_estimate {
            Some(price) => log::info!("Sold-listing estimate: {:.2}", price),
            None => log::info!("No sold listings for UPC {}, falling back to MSRP", upc),
        }

        tracker.enter(Stage::Generating);
        let metadata = self.metadata.generate(upc).await?;

        let (price, price_source) = self.policy.select(sold_estimate, &metadata.msrp)?;
        log::info!("Listing price {:.2} (from {})", price, price_source);

        tracker.enter(Stage::Publishing);
        let payload = ListingPayload::new(sku, metadata, price, upc.clone());
        let outcome = self.publisher.create_product(&payload).await?;

        Ok(ListingReport {
            payload,
            price_source,
            outcome,
        })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
