//! Fridge inventory model and merge algorithm
//!
//! An inventory maps item names (case-sensitive) to quantity and unit price.
//! Merging a scanned batch only ever adds: quantities accumulate and the unit
//! price is recomputed as the weighted average cost across all units ever
//! added, so `quantity * unit_price` stays the total value paid.

use crate::batch::ValidatedBatch;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored item: how much of it is in the fridge and at what average price.
///
/// Invariant: `quantity > 0`, `unit_price >= 0`, price rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Full fridge contents for one user, keyed by item name.
///
/// A BTreeMap keeps iteration order stable for logging and tests; the mapping
/// itself is order-independent.
pub type Inventory = BTreeMap<String, ItemRecord>;

/// Round a money value to 2 decimal places (banker's rounding).
///
/// Applied whenever a price is about to be persisted, so repeated merges never
/// accumulate more than single-cent drift per merge.
pub(crate) fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Merge a validated batch of newly scanned items into the current inventory.
///
/// Pure function: returns the new inventory, leaves the input untouched.
/// New names are inserted as-is (price rounded); existing names accumulate
/// quantity and get a weighted-average price. Entries of `current` not named
/// in the batch carry over unchanged; nothing is ever removed or zeroed.
pub fn merge(current: &Inventory, batch: &ValidatedBatch) -> Inventory {
    let mut updated = current.clone();

    for (name, incoming) in batch.items() {
        match updated.get_mut(name) {
            Some(existing) => {
                let new_price = weighted_average_price(existing, incoming);
                existing.quantity += incoming.quantity;
                existing.unit_price = new_price;
                log::debug!(
                    "Updated existing item '{}': +{} units, price now {}",
                    name,
                    incoming.quantity,
                    existing.unit_price
                );
            }
            None => {
                let record = ItemRecord {
                    quantity: incoming.quantity,
                    unit_price: round2(incoming.unit_price),
                };
                log::debug!(
                    "Added new item '{}': {} units @ {}",
                    name,
                    record.quantity,
                    record.unit_price
                );
                updated.insert(name.clone(), record);
            }
        }
    }

    updated
}

/// Weighted average unit price of the existing stock plus the incoming units.
///
/// Conserves total value: (q_old * p_old + q_new * p_new) / (q_old + q_new),
/// rounded to 2 decimals. Quantities are strictly positive by invariant, so
/// the denominator is never zero.
fn weighted_average_price(existing: &ItemRecord, incoming: &ItemRecord) -> Decimal {
    let total_quantity = existing.quantity + incoming.quantity;
    let total_value =
        existing.quantity * existing.unit_price + incoming.quantity * incoming.unit_price;
    round2(total_value / total_quantity)
}

/// Total value of an inventory: sum of quantity * unit_price over all items.
pub fn total_value(inventory: &Inventory) -> Decimal {
    inventory
        .values()
        .map(|item| item.quantity * item.unit_price)
        .sum()
}
