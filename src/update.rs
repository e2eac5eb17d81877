//! Fridge update orchestration
//!
//! Composes validation, fetch-or-create, merge and replace into one update
//! operation. Validation failures short-circuit before any store access;
//! store failures discard the merged result so no partial state is visible.

use crate::batch::{RawBatch, ValidatedBatch};
use crate::database::{FridgeStore, StoreResult};
use crate::error::UpdateResult;
use crate::inventory::{merge, Inventory};
use serde::Serialize;

/// Outcome of one successful fridge update
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    /// Number of distinct item names in the scanned batch
    pub items_added: usize,
    /// The inventory as persisted after the merge
    pub inventory: Inventory,
}

/// Applies scanned batches to stored fridges.
///
/// Holds the store it was constructed with; no global state. Clones share
/// the underlying store handle, so one updater can serve many threads.
#[derive(Clone)]
pub struct FridgeUpdater {
    store: FridgeStore,
}

impl FridgeUpdater {
    pub fn new(store: FridgeStore) -> Self {
        Self { store }
    }

    /// Merge a scanned batch into the user's stored fridge.
    ///
    /// Steps: validate the batch (no store access on failure), take the
    /// per-user lock for the rest of the call, fetch the current inventory
    /// (creating an empty fridge row on first update), merge, and replace the
    /// stored row wholesale. Concurrent updates for the same uid serialize on
    /// the lock; a failed replace leaves the previous inventory intact.
    pub fn update(&self, uid: &str, batch: &RawBatch) -> UpdateResult<UpdateReport> {
        let validated = ValidatedBatch::validate(batch)?;

        log::info!(
            "Starting fridge update for user {} with {} items",
            uid,
            validated.len()
        );

        let lock = self.store.user_lock(uid);
        let _guard = lock.lock().unwrap();

        let current = match self.store.fetch(uid)? {
            Some(inventory) => inventory,
            None => {
                log::info!("No existing fridge found for user {}, creating new one", uid);
                self.store.create_if_absent(uid)?;
                Inventory::new()
            }
        };

        let merged = merge(&current, &validated);
        self.store.replace(uid, &merged)?;

        log::info!(
            "Updated fridge for user {}: {} scanned items, {} distinct items stored",
            uid,
            validated.len(),
            merged.len()
        );

        Ok(UpdateReport {
            items_added: validated.len(),
            inventory: merged,
        })
    }

    /// Read the user's fridge without modifying it.
    ///
    /// `None` means the user has no fridge record at all; an empty map means
    /// an existing fridge with nothing in it.
    pub fn get_inventory(&self, uid: &str) -> StoreResult<Option<Inventory>> {
        self.store.fetch(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::RawItem;
    use crate::error::{StoreError, UpdateError, ValidationError};
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::time::Duration;

    fn updater() -> FridgeUpdater {
        FridgeUpdater::new(FridgeStore::open_in_memory().unwrap())
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn raw_item(quantity: f64, unit_price: f64) -> RawItem {
        RawItem {
            quantity: Some(json!(quantity)),
            unit_price: Some(json!(unit_price)),
        }
    }

    fn raw_batch(entries: &[(&str, f64, f64)]) -> RawBatch {
        entries
            .iter()
            .map(|(name, q, p)| (name.to_string(), raw_item(*q, *p)))
            .collect()
    }

    #[test]
    fn first_update_creates_record_and_stores_items() {
        let updater = updater();
        let report = updater
            .update("u1", &raw_batch(&[("milk", 2.0, 3.0)]))
            .unwrap();

        assert_eq!(report.items_added, 1);
        assert_eq!(report.inventory["milk"].quantity, d("2"));

        let stored = updater.get_inventory("u1").unwrap().unwrap();
        assert_eq!(stored, report.inventory);
    }

    #[test]
    fn repeated_updates_accumulate_with_weighted_average() {
        let updater = updater();
        updater
            .update("u1", &raw_batch(&[("milk", 2.0, 3.0)]))
            .unwrap();
        let report = updater
            .update("u1", &raw_batch(&[("milk", 2.0, 5.0)]))
            .unwrap();

        assert_eq!(report.inventory["milk"].quantity, d("4"));
        assert_eq!(report.inventory["milk"].unit_price, d("4.00"));
    }

    #[test]
    fn invalid_batch_fails_without_touching_store() {
        let updater = updater();
        let err = updater.update("u1", &RawBatch::new()).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Validation(ValidationError::EmptyBatch)
        ));

        // No row was created for the user
        assert!(updater.get_inventory("u1").unwrap().is_none());
    }

    #[test]
    fn no_record_and_empty_record_are_distinct() {
        let updater = updater();

        assert!(updater.get_inventory("never-seen").unwrap().is_none());

        // A created-but-untouched fridge reads back as empty, not missing
        let store = FridgeStore::open_in_memory().unwrap();
        store.create_if_absent("created").unwrap();
        let updater = FridgeUpdater::new(store);
        let inventory = updater.get_inventory("created").unwrap().unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn failed_replace_discards_merge_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fridge.db");

        {
            let store = FridgeStore::open(&path, Duration::from_secs(1)).unwrap();
            FridgeUpdater::new(store)
                .update("u1", &raw_batch(&[("milk", 2.0, 3.0)]))
                .unwrap();
        }

        // Make replace fail deterministically after fetch succeeds
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "query_only", true).unwrap();
        let readonly = FridgeUpdater::new(FridgeStore::from_connection(conn));

        let err = readonly
            .update("u1", &raw_batch(&[("milk", 2.0, 5.0)]))
            .unwrap_err();
        assert!(matches!(err, UpdateError::Store(StoreError::Unavailable(_))));

        // Stored value equals the pre-update snapshot
        let store = FridgeStore::open(&path, Duration::from_secs(1)).unwrap();
        let stored = store.fetch("u1").unwrap().unwrap();
        assert_eq!(stored["milk"].quantity, d("2"));
        assert_eq!(stored["milk"].unit_price, d("3.00"));
    }

    #[test]
    fn update_report_serializes_for_callers() {
        let updater = updater();
        let report = updater
            .update("u1", &raw_batch(&[("milk", 2.0, 3.0)]))
            .unwrap();

        let encoded = serde_json::to_string(&report).unwrap();
        assert!(encoded.contains("\"items_added\":1"));
        assert!(encoded.contains("\"milk\""));
    }
}
