//! Product Lister - UPC to Sellbrite listing
//!
//! Scans a UPC barcode, asks OpenAI for product metadata, estimates a resale
//! price from eBay sold listings and creates the product in Sellbrite.

pub mod config;
pub mod ebay;
pub mod error;
pub mod models;
pub mod openai;
pub mod pipeline;
pub mod scanner;
pub mod sellbrite;
pub mod sequence;

pub use config::{Config, CounterBackend, Credentials};
pub use error::{ListerError, Result};
pub use models::{ListingPayload, PriceSource, PricingPolicy, ProductMetadata, Sku, Upc};
pub use pipeline::{ListingPipeline, ListingReport, Stage, StageTracker};
pub use sellbrite::{AuthScheme, PublishOutcome};
