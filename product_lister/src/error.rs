//! Error types for product_lister

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for product_lister operations
#[derive(Debug, Error)]
pub enum ListerError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to parse or serialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Query service answered with a non-success status
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Counter file does not exist
    #[error("Counter store not found: {}", .0.display())]
    StoreNotFound(PathBuf),

    /// Counter file does not hold an integer
    #[error("Counter store {} does not contain an integer: {content:?}", path.display())]
    CounterParse { path: PathBuf, content: String },

    /// Counter already holds the largest value it can store
    #[error("Counter store {} cannot advance past {value}", path.display())]
    CounterExhausted { path: PathBuf, value: String },

    /// External service returned something we cannot interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// MSRP fallback was not a plain number
    #[error("Cannot parse price from {0:?}")]
    PriceParse(String),

    /// UPC text is empty or contains non-digits
    #[error("Invalid UPC: {0:?}")]
    InvalidUpc(String),

    /// Camera could not be opened or streamed
    #[error("Camera error: {0}")]
    Camera(String),

    /// Scan ended without a UPC (timeout, cancel, no more frames)
    #[error("Scan stopped: {0}")]
    ScanStopped(String),

    /// Missing credential or inconsistent option
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias for product_lister operations
pub type Result<T> = std::result::Result<T, ListerError>;
