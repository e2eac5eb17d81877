//! Fridge Sync - Smart Fridge Inventory
//!
//! Scans grocery receipts with a vision model and merges the extracted items
//! into a per-user fridge inventory stored in SQLite. The merge engine is the
//! core: weighted-average prices, additive-only quantities, and a
//! read-modify-write persistence contract serialized per user.

pub mod batch;
pub mod database;
pub mod error;
pub mod inventory;
pub mod scanner;
pub mod update;

pub use batch::{RawBatch, RawItem, ValidatedBatch};
pub use database::FridgeStore;
pub use error::{ScanError, StoreError, UpdateError, ValidationError};
pub use inventory::{merge, total_value, Inventory, ItemRecord};
pub use scanner::ReceiptScanner;
pub use update::{FridgeUpdater, UpdateReport};
