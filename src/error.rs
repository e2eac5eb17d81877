//! Error types for fridge_sync
//!
//! Split by failure domain so callers can tell a malformed batch (fixable by
//! re-scanning) from an unavailable store (retryable with backoff).

use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

/// A scanned batch failed validation before touching any stored state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The batch has no entries at all
    #[error("batch contains no items")]
    EmptyBatch,
    /// An item name is empty or whitespace-only
    #[error("invalid item name: '{0}'")]
    InvalidName(String),
    /// An entry lacks a required field (or it is null)
    #[error("item '{item}' is missing required field '{field}'")]
    MissingField { item: String, field: &'static str },
    /// A field value could not be interpreted as a decimal number
    #[error("item '{item}' has non-numeric {field}: {value}")]
    NonNumeric {
        item: String,
        field: &'static str,
        value: String,
    },
    /// Quantity must be strictly positive
    #[error("item '{item}' has non-positive quantity: {quantity}")]
    NonPositiveQuantity { item: String, quantity: Decimal },
    /// Unit price must be non-negative
    #[error("item '{item}' has negative unit price: {price}")]
    NegativePrice { item: String, price: Decimal },
}

/// Store gateway failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not complete the operation (connectivity, lock
    /// timeout, I/O). The previously stored value is intact.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
    /// The inventory column could not be (de)serialized
    #[error("inventory for user '{uid}' could not be decoded: {source}")]
    Serde {
        uid: String,
        #[source]
        source: serde_json::Error,
    },
    /// No fridge row exists for this user
    #[error("no fridge record exists for user '{uid}'")]
    NoRecord { uid: String },
}

/// Receipt scanner failure
#[derive(Debug, Error)]
pub enum ScanError {
    /// Image path does not exist or is not a regular file
    #[error("image file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Image extension is not a supported format
    #[error("unsupported image format: '{0}'")]
    UnsupportedFormat(String),
    /// Image exceeds the size limit
    #[error("image file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
    /// Failed to read the image from disk
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    /// HTTP request to the inference service failed
    #[error("scanner service error: {0}")]
    Service(#[from] reqwest::Error),
    /// Inference service returned an error status
    #[error("scanner service returned HTTP {0}")]
    HttpStatus(reqwest::StatusCode),
    /// The model reply did not contain a parseable item listing
    #[error("could not parse scanner response: {0}")]
    Parse(String),
}

/// Top-level failure of one fridge update operation
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for fridge update operations
pub type UpdateResult<T> = std::result::Result<T, UpdateError>;
