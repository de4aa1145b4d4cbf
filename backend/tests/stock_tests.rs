//! Stock batch tests
//!
//! Covers quantity/status coupling, pinned status handling, reservation
//! lifecycle and first-expire-first-out batch selection.

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use shared::{fefo_order, select_optimal_batch, StockBatch, StockError, StockStatus};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2025, 6, 15)
}

fn batch(quantity: i32, minimum: i32, expiry: Option<NaiveDate>) -> StockBatch {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    StockBatch::new(
        Uuid::new_v4(),
        format!("LOT-{}", quantity),
        expiry,
        quantity,
        minimum,
        now,
    )
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn deduction_drives_low_stock_then_out_of_stock() {
        let mut b = batch(10, 5, None);
        assert_eq!(b.status, StockStatus::Available);

        b.deduct_quantity(6).unwrap();
        assert_eq!(b.quantity, 4);
        assert_eq!(b.status, StockStatus::LowStock);

        b.deduct_quantity(4).unwrap();
        assert_eq!(b.quantity, 0);
        assert_eq!(b.status, StockStatus::OutOfStock);
    }

    #[test]
    fn deduction_beyond_available_fails_without_effect() {
        let mut b = batch(10, 5, None);
        let err = b.deduct_quantity(11).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientQuantity {
                available: 10,
                requested: 11,
            }
        );
        assert_eq!(b.quantity, 10);
        assert_eq!(b.status, StockStatus::Available);
    }

    #[test]
    fn negative_adjustments_are_rejected() {
        let mut b = batch(10, 5, None);
        assert_eq!(b.deduct_quantity(-1), Err(StockError::NegativeAmount));
        assert_eq!(b.add_quantity(-1), Err(StockError::NegativeAmount));
        assert_eq!(b.quantity, 10);
    }

    #[test]
    fn restock_clears_quantity_derived_statuses() {
        let mut b = batch(10, 5, None);
        b.deduct_quantity(10).unwrap();
        assert_eq!(b.status, StockStatus::OutOfStock);

        b.add_quantity(2).unwrap();
        // Back above zero but still below minimum
        assert_eq!(b.status, StockStatus::Available);
        b.refresh_status();
        assert_eq!(b.status, StockStatus::LowStock);

        b.add_quantity(10).unwrap();
        b.refresh_status();
        assert_eq!(b.status, StockStatus::Available);
    }

    #[test]
    fn new_batch_status_derives_from_initial_quantity() {
        assert_eq!(batch(0, 5, None).status, StockStatus::OutOfStock);
        assert_eq!(batch(3, 5, None).status, StockStatus::LowStock);
        assert_eq!(batch(10, 5, None).status, StockStatus::Available);
    }

    #[test]
    fn pinned_statuses_survive_refresh() {
        let mut b = batch(10, 5, None);
        b.mark_recalled();
        b.refresh_status();
        assert_eq!(b.status, StockStatus::Recalled);

        let mut b = batch(10, 5, None);
        b.mark_damaged();
        b.deduct_quantity(10).unwrap();
        // deduct only moves between quantity-derived statuses
        assert_eq!(b.status, StockStatus::Damaged);
    }

    #[test]
    fn reservation_requires_sellable_batch() {
        let mut expired = batch(10, 5, Some(date(2025, 1, 1)));
        expired.mark_reserved(today());
        assert_ne!(expired.status, StockStatus::Reserved);

        let mut ok = batch(10, 5, Some(date(2026, 1, 1)));
        ok.mark_reserved(today());
        assert_eq!(ok.status, StockStatus::Reserved);
    }

    #[test]
    fn release_reservation_is_idempotent() {
        let mut b = batch(10, 5, None);
        b.mark_reserved(today());
        assert_eq!(b.status, StockStatus::Reserved);

        b.release_reservation();
        assert_eq!(b.status, StockStatus::Available);

        // Releasing again changes nothing
        b.release_reservation();
        assert_eq!(b.status, StockStatus::Available);

        let mut damaged = batch(10, 5, None);
        damaged.mark_damaged();
        damaged.release_reservation();
        assert_eq!(damaged.status, StockStatus::Damaged);
    }

    #[test]
    fn fefo_selects_earliest_batch_that_covers_request() {
        let t = today();
        let batches = vec![
            batch(100, 0, Some(t + chrono::Duration::days(60))),
            batch(100, 0, Some(t + chrono::Duration::days(5))),
            batch(100, 0, Some(t + chrono::Duration::days(20))),
        ];

        let chosen = select_optimal_batch(&batches, 50, t).unwrap();
        assert_eq!(chosen.expiry_date, Some(t + chrono::Duration::days(5)));
    }

    #[test]
    fn fefo_skips_batches_too_small_for_the_request() {
        let t = today();
        let small_early = batch(10, 0, Some(t + chrono::Duration::days(5)));
        let big_late = batch(100, 0, Some(t + chrono::Duration::days(20)));
        let batches = vec![big_late, small_early];

        let chosen = select_optimal_batch(&batches, 50, t).unwrap();
        assert_eq!(chosen.expiry_date, Some(t + chrono::Duration::days(20)));

        // No single batch can cover the request
        assert!(select_optimal_batch(&batches, 500, t).is_none());
    }

    #[test]
    fn batch_without_expiry_sorts_last() {
        let t = today();
        let dated = batch(100, 0, Some(t + chrono::Duration::days(300)));
        let undated = batch(100, 0, None);

        assert!(dated.should_be_prioritized(&undated));
        assert!(!undated.should_be_prioritized(&dated));
        assert!(!undated.should_be_prioritized(&undated));

        let batches = vec![undated, dated];
        let chosen = select_optimal_batch(&batches, 50, t).unwrap();
        assert!(chosen.expiry_date.is_some());
    }

    #[test]
    fn expired_and_pinned_batches_are_never_allocated() {
        let t = today();
        let mut expired = batch(100, 0, Some(date(2025, 1, 1)));
        expired.mark_expired();
        let mut reserved = batch(100, 0, Some(t + chrono::Duration::days(10)));
        reserved.mark_reserved(t);
        let batches = vec![expired, reserved];

        assert!(select_optimal_batch(&batches, 10, t).is_none());
    }

    #[test]
    fn fefo_order_is_total_over_optional_dates() {
        use std::cmp::Ordering;
        let t = today();
        let early = batch(1, 0, Some(t + chrono::Duration::days(1)));
        let late = batch(1, 0, Some(t + chrono::Duration::days(9)));
        let none = batch(1, 0, None);

        assert_eq!(fefo_order(&early, &late), Ordering::Less);
        assert_eq!(fefo_order(&late, &early), Ordering::Greater);
        assert_eq!(fefo_order(&early, &none), Ordering::Less);
        assert_eq!(fefo_order(&none, &early), Ordering::Greater);
        assert_eq!(fefo_order(&none, &none), Ordering::Equal);
    }

    #[test]
    fn usage_percentage_tracks_consumption() {
        let mut b = batch(100, 0, None);
        assert_eq!(b.usage_percentage(), 0.0);

        b.deduct_quantity(25).unwrap();
        assert_eq!(b.usage_percentage(), 25.0);

        b.deduct_quantity(75).unwrap();
        assert_eq!(b.usage_percentage(), 100.0);

        let empty = batch(0, 0, None);
        assert_eq!(empty.usage_percentage(), 0.0);
    }

    #[test]
    fn near_expiry_window_excludes_day_zero() {
        let t = today();
        let b = batch(10, 0, Some(t + chrono::Duration::days(5)));
        assert!(b.is_near_expiry(t, 7));
        assert!(!b.is_near_expiry(t, 3));

        let expires_today = batch(10, 0, Some(t));
        assert!(!expires_today.is_near_expiry(t, 7));
        assert!(!expires_today.is_expired(t));
        assert!(expires_today.is_available_for_sale(t));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Deducting then adding the same amount restores the quantity.
        #[test]
        fn deduct_then_add_round_trips(initial in 0i32..10_000, amount in 0i32..10_000) {
            let mut b = batch(initial, 0, None);
            if amount <= initial {
                b.deduct_quantity(amount).unwrap();
                b.add_quantity(amount).unwrap();
                prop_assert_eq!(b.quantity, initial);
            } else {
                prop_assert!(b.deduct_quantity(amount).is_err());
                prop_assert_eq!(b.quantity, initial);
            }
        }

        /// Quantity never goes negative and status stays consistent with it.
        #[test]
        fn status_tracks_quantity(
            initial in 0i32..1_000,
            minimum in 0i32..1_000,
            deductions in proptest::collection::vec(0i32..200, 0..20),
        ) {
            let mut b = batch(initial, minimum, None);
            for d in deductions {
                let _ = b.deduct_quantity(d);
                prop_assert!(b.quantity >= 0);
                if b.quantity == 0 {
                    prop_assert_eq!(b.status, StockStatus::OutOfStock);
                } else if b.quantity < minimum && b.status != StockStatus::Available {
                    // A deduction below minimum always lands on LOW_STOCK
                    prop_assert_eq!(b.status, StockStatus::LowStock);
                }
            }
        }

        /// The chosen batch covers the request, is sellable, and no sellable
        /// batch expiring earlier could also cover it.
        #[test]
        fn fefo_choice_is_earliest_sufficient(
            quantities in proptest::collection::vec(0i32..200, 1..10),
            offsets in proptest::collection::vec(1i64..400, 1..10),
            requested in 1i32..150,
        ) {
            let t = today();
            let batches: Vec<StockBatch> = quantities
                .iter()
                .zip(offsets.iter())
                .map(|(&q, &off)| batch(q, 0, Some(t + chrono::Duration::days(off))))
                .collect();

            match select_optimal_batch(&batches, requested, t) {
                Some(chosen) => {
                    prop_assert!(chosen.quantity >= requested);
                    prop_assert!(chosen.is_available_for_sale(t));
                    for other in &batches {
                        if other.quantity >= requested
                            && other.is_available_for_sale(t)
                            && other.should_be_prioritized(chosen)
                        {
                            return Err(TestCaseError::fail("earlier sufficient batch skipped"));
                        }
                    }
                }
                None => {
                    for b in &batches {
                        prop_assert!(b.quantity < requested || !b.is_available_for_sale(t));
                    }
                }
            }
        }
    }
}
