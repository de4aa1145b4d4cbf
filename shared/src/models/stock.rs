//! Stock batch domain model
//!
//! Each product can have multiple batches with distinct lot numbers and
//! expiry dates. A batch owns its quantity mutation rules and the coupling
//! between quantity and status. Statuses split into two groups: the
//! quantity-derived ones (AVAILABLE / LOW_STOCK / OUT_OF_STOCK) and the
//! pinned overrides (EXPIRED / RESERVED / DAMAGED / RECALLED) which are
//! authoritative until explicitly cleared.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::expiry;

/// Stock batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Available,
    LowStock,
    OutOfStock,
    Expired,
    NearExpiry,
    Reserved,
    Damaged,
    Recalled,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "available",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Expired => "expired",
            StockStatus::NearExpiry => "near_expiry",
            StockStatus::Reserved => "reserved",
            StockStatus::Damaged => "damaged",
            StockStatus::Recalled => "recalled",
        }
    }

    /// Pinned statuses are authoritative over quantity-derived status and
    /// survive `refresh_status`.
    pub fn is_pinned(&self) -> bool {
        matches!(
            self,
            StockStatus::Expired
                | StockStatus::Reserved
                | StockStatus::Damaged
                | StockStatus::Recalled
        )
    }
}

impl FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(StockStatus::Available),
            "low_stock" => Ok(StockStatus::LowStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            "expired" => Ok(StockStatus::Expired),
            "near_expiry" => Ok(StockStatus::NearExpiry),
            "reserved" => Ok(StockStatus::Reserved),
            "damaged" => Ok(StockStatus::Damaged),
            "recalled" => Ok(StockStatus::Recalled),
            other => Err(format!("unknown stock status: {}", other)),
        }
    }
}

/// Domain-level stock operation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("quantity adjustment cannot be negative")]
    NegativeAmount,

    #[error("insufficient quantity: available {available}, requested {requested}")]
    InsufficientQuantity { available: i32, requested: i32 },
}

/// One expiry-dated quantity of a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: i32,
    pub initial_quantity: i32,
    pub minimum_stock_level: i32,
    pub status: StockStatus,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockBatch {
    /// Creates a batch for newly received inventory. Quantity starts at the
    /// initial quantity and the status is derived from it.
    pub fn new(
        product_id: Uuid,
        batch_number: String,
        expiry_date: Option<NaiveDate>,
        initial_quantity: i32,
        minimum_stock_level: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut batch = Self {
            id: Uuid::new_v4(),
            product_id,
            batch_number,
            expiry_date,
            quantity: initial_quantity,
            initial_quantity,
            minimum_stock_level,
            status: StockStatus::Available,
            storage_location: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        batch.refresh_status();
        batch
    }

    pub fn is_below_minimum_level(&self) -> bool {
        self.quantity < self.minimum_stock_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity <= 0
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        expiry::is_expired(today, self.expiry_date)
    }

    pub fn is_near_expiry(&self, today: NaiveDate, threshold_days: i64) -> bool {
        expiry::is_near_expiry(today, self.expiry_date, threshold_days)
    }

    /// Days until expiry, clamped at zero. `None` when the batch has no
    /// expiry date.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        expiry::remaining_days(today, self.expiry_date)
    }

    pub fn is_available_for_sale(&self, today: NaiveDate) -> bool {
        self.status == StockStatus::Available && !self.is_expired(today) && !self.is_out_of_stock()
    }

    /// Removes `amount` units. No partial effect on failure.
    pub fn deduct_quantity(&mut self, amount: i32) -> Result<(), StockError> {
        if amount < 0 {
            return Err(StockError::NegativeAmount);
        }
        if amount > self.quantity {
            return Err(StockError::InsufficientQuantity {
                available: self.quantity,
                requested: amount,
            });
        }
        self.quantity -= amount;

        if self.quantity == 0 {
            self.status = StockStatus::OutOfStock;
        } else if self.is_below_minimum_level() {
            self.status = StockStatus::LowStock;
        }
        Ok(())
    }

    /// Adds `amount` units, clearing OUT_OF_STOCK / LOW_STOCK when the new
    /// quantity warrants it.
    pub fn add_quantity(&mut self, amount: i32) -> Result<(), StockError> {
        if amount < 0 {
            return Err(StockError::NegativeAmount);
        }
        self.quantity += amount;

        if self.quantity > 0 && self.status == StockStatus::OutOfStock {
            self.status = StockStatus::Available;
        }
        if !self.is_below_minimum_level() && self.status == StockStatus::LowStock {
            self.status = StockStatus::Available;
        }
        Ok(())
    }

    /// Re-derives the quantity-based status unless a pinned status is in
    /// effect.
    pub fn refresh_status(&mut self) {
        if self.status.is_pinned() {
            return;
        }
        self.status = if self.quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.is_below_minimum_level() {
            StockStatus::LowStock
        } else {
            StockStatus::Available
        };
    }

    pub fn mark_expired(&mut self) {
        self.status = StockStatus::Expired;
    }

    pub fn mark_damaged(&mut self) {
        self.status = StockStatus::Damaged;
    }

    pub fn mark_recalled(&mut self) {
        self.status = StockStatus::Recalled;
    }

    /// Reserves the batch; no-op unless it is currently sellable.
    pub fn mark_reserved(&mut self, today: NaiveDate) {
        if self.is_available_for_sale(today) {
            self.status = StockStatus::Reserved;
        }
    }

    /// Releases a reservation; no-op for any other status.
    pub fn release_reservation(&mut self) -> bool {
        if self.status == StockStatus::Reserved {
            self.status = StockStatus::Available;
            true
        } else {
            false
        }
    }

    /// Share of the initial quantity already consumed, as a percentage
    pub fn usage_percentage(&self) -> f64 {
        if self.initial_quantity <= 0 {
            return 0.0;
        }
        let used = self.initial_quantity - self.quantity;
        f64::from(used) * 100.0 / f64::from(self.initial_quantity)
    }

    /// FEFO comparison: true when this batch should be sold before `other`.
    /// A batch without an expiry date never beats one with a date.
    pub fn should_be_prioritized(&self, other: &StockBatch) -> bool {
        match (self.expiry_date, other.expiry_date) {
            (Some(a), Some(b)) => a < b,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Orders batches for FEFO allocation: earliest expiry first, batches
/// without an expiry date last.
pub fn fefo_order(a: &StockBatch, b: &StockBatch) -> Ordering {
    match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Picks the batch to fulfill `requested` units under FEFO: the first batch
/// in expiry order that can cover the whole request on its own. Returns
/// `None` when no single batch qualifies — callers needing split fulfillment
/// must loop explicitly.
pub fn select_optimal_batch<'a>(
    batches: &'a [StockBatch],
    requested: i32,
    today: NaiveDate,
) -> Option<&'a StockBatch> {
    let mut ordered: Vec<&StockBatch> = batches.iter().collect();
    ordered.sort_by(|a, b| fefo_order(a, b));
    ordered
        .into_iter()
        .find(|b| b.quantity >= requested && b.is_available_for_sale(today))
}
