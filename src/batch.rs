//! Scanned item batches and their validation
//!
//! The scanner is an untrusted producer: item fields may be missing, null,
//! strings, or garbage. Nothing from a scan touches stored state until it has
//! passed through [`ValidatedBatch::validate`].

use crate::error::ValidationError;
use crate::inventory::ItemRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One item as produced by the scanner, before validation.
///
/// Both fields are raw JSON values: receipts get transcribed by a vision
/// model, which sometimes emits numbers as strings ("2" instead of 2) or
/// drops a field entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub unit_price: Option<Value>,
}

/// A batch of scanned items keyed by item name, not yet validated.
pub type RawBatch = BTreeMap<String, RawItem>;

/// A batch whose entries all passed validation: names non-empty, quantities
/// positive, prices non-negative. Only constructible through [`validate`].
///
/// [`validate`]: ValidatedBatch::validate
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
    items: BTreeMap<String, ItemRecord>,
}

impl ValidatedBatch {
    /// Validate a raw batch.
    ///
    /// Total and side-effect-free. Entries are checked in one pass in map
    /// order (lexicographic by name, so the reported failure is
    /// deterministic); per entry the sequence is name, presence of both
    /// fields, numeric interpretation, quantity sign, price sign. The first
    /// failure is returned.
    pub fn validate(batch: &RawBatch) -> Result<Self, ValidationError> {
        if batch.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }

        let mut items = BTreeMap::new();
        for (name, raw) in batch {
            if name.trim().is_empty() {
                return Err(ValidationError::InvalidName(name.clone()));
            }

            let quantity = field_as_decimal(name, "quantity", raw.quantity.as_ref())?;
            let unit_price = field_as_decimal(name, "unit_price", raw.unit_price.as_ref())?;

            if quantity <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveQuantity {
                    item: name.clone(),
                    quantity,
                });
            }
            if unit_price < Decimal::ZERO {
                return Err(ValidationError::NegativePrice {
                    item: name.clone(),
                    price: unit_price,
                });
            }

            items.insert(name.clone(), ItemRecord { quantity, unit_price });
        }

        Ok(Self { items })
    }

    /// The validated entries, keyed by item name.
    pub fn items(&self) -> &BTreeMap<String, ItemRecord> {
        &self.items
    }

    /// Number of distinct item names in the batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Build a batch directly from already-valid records (test helper).
    #[cfg(test)]
    pub(crate) fn from_records(items: BTreeMap<String, ItemRecord>) -> Self {
        Self { items }
    }
}

/// Interpret one field of a raw item as a decimal.
fn field_as_decimal(
    item: &str,
    field: &'static str,
    value: Option<&Value>,
) -> Result<Decimal, ValidationError> {
    let value = value.ok_or_else(|| ValidationError::MissingField {
        item: item.to_string(),
        field,
    })?;

    parse_decimal(value).ok_or_else(|| ValidationError::NonNumeric {
        item: item.to_string(),
        field,
        value: value.to_string(),
    })
}

/// Parse a JSON value as a decimal number.
///
/// Accepts JSON numbers and numeric strings (the scanner model coerces
/// inconsistently). Exponent notation falls back to scientific parsing.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}
