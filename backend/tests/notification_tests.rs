//! Notification lifecycle tests
//!
//! Covers the state machine (send, deliver, read, fail, retry, cancel),
//! bounded retries and duplicate suppression windows.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use shared::{
    has_recent_notification, NotificationChannel, NotificationRecord, NotificationStatus,
    NotificationType, RelatedEntity, DEFAULT_MAX_RETRIES,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
}

fn record(notification_type: NotificationType) -> NotificationRecord {
    NotificationRecord::new(
        Some(Uuid::new_v4()),
        notification_type,
        NotificationChannel::Email,
        "subject".to_string(),
        "message".to_string(),
        Some(RelatedEntity::Medication(Uuid::new_v4())),
        now(),
    )
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn new_record_starts_pending_with_type_priority() {
        let n = record(NotificationType::MedicationExpiry);
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.retry_count, 0);
        assert_eq!(n.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(n.priority, 4);

        let s = record(NotificationType::StockExpiry);
        assert_eq!(s.priority, 3);
    }

    #[test]
    fn happy_path_pending_sent_delivered_read() {
        let mut n = record(NotificationType::PrescriptionExpiry);
        let t = now();

        assert!(n.mark_sent(t));
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.sent_at, Some(t));

        assert!(n.mark_delivered(t + Duration::minutes(1)));
        assert_eq!(n.status, NotificationStatus::Delivered);

        assert!(n.mark_read(t + Duration::minutes(5)));
        assert_eq!(n.status, NotificationStatus::Read);
        assert_eq!(n.read_at, Some(t + Duration::minutes(5)));
    }

    #[test]
    fn scheduling_defers_readiness() {
        let mut n = record(NotificationType::LowStock);
        let t = now();

        assert!(n.is_ready_to_send(t));
        assert!(n.schedule(t + Duration::hours(2)));
        assert_eq!(n.status, NotificationStatus::Scheduled);

        assert!(!n.is_ready_to_send(t));
        assert!(!n.is_ready_to_send(t + Duration::hours(1)));
        assert!(n.is_ready_to_send(t + Duration::hours(2)));
        assert!(n.is_ready_to_send(t + Duration::hours(3)));

        // Only a pending record can be scheduled
        let mut sent = record(NotificationType::LowStock);
        sent.mark_sent(t);
        assert!(!sent.schedule(t + Duration::hours(1)));
    }

    #[test]
    fn cancel_only_from_pending() {
        let mut n = record(NotificationType::StockExpiry);
        assert!(n.cancel());
        assert_eq!(n.status, NotificationStatus::Cancelled);

        let mut sent = record(NotificationType::StockExpiry);
        sent.mark_sent(now());
        assert!(!sent.cancel());
        assert_eq!(sent.status, NotificationStatus::Sent);

        let mut failed = record(NotificationType::StockExpiry);
        failed.mark_failed("smtp timeout");
        assert!(!failed.cancel());
        assert_eq!(failed.status, NotificationStatus::Failed);
    }

    #[test]
    fn cancelled_record_accepts_nothing() {
        let mut n = record(NotificationType::StockExpiry);
        n.cancel();
        let t = now();
        assert!(!n.mark_sent(t));
        assert!(!n.mark_delivered(t));
        assert!(!n.mark_read(t));
        assert!(!n.mark_failed("late failure"));
        assert!(!n.reset_for_retry());
        assert_eq!(n.status, NotificationStatus::Cancelled);
    }

    #[test]
    fn failure_records_reason_and_retry_clears_it() {
        let mut n = record(NotificationType::MedicationExpiry);
        n.mark_failed("mailbox full");
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.error_message.as_deref(), Some("mailbox full"));

        assert!(n.reset_for_retry());
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.retry_count, 1);
        assert_eq!(n.error_message, None);
    }

    #[test]
    fn retries_are_bounded() {
        let mut n = record(NotificationType::MedicationExpiry);

        for attempt in 1..=DEFAULT_MAX_RETRIES {
            n.mark_failed("delivery refused");
            assert!(n.can_be_retried());
            assert!(n.reset_for_retry());
            assert_eq!(n.retry_count, attempt);
        }

        // Retry budget is spent
        n.mark_failed("delivery refused");
        assert!(!n.can_be_retried());
        assert!(!n.reset_for_retry());
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.retry_count, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn dedup_windows_differ_by_type() {
        assert_eq!(NotificationType::MedicationExpiry.dedup_window_days(), 7);
        assert_eq!(NotificationType::PrescriptionExpiry.dedup_window_days(), 7);
        assert_eq!(NotificationType::StockExpiry.dedup_window_days(), 30);
        assert_eq!(NotificationType::LowStock.dedup_window_days(), 7);
    }

    #[test]
    fn recent_notification_suppresses_within_window() {
        let entity = RelatedEntity::Stock(Uuid::new_v4());
        let t = now();

        let mut old = NotificationRecord::new(
            None,
            NotificationType::StockExpiry,
            NotificationChannel::System,
            "s".to_string(),
            "m".to_string(),
            Some(entity),
            t - Duration::days(10),
        );

        let records = vec![old.clone()];
        // 10 days old, inside the 30-day stock window
        assert!(has_recent_notification(
            &records,
            entity,
            NotificationType::StockExpiry,
            t
        ));

        // Outside the window
        let stale = NotificationRecord {
            created_at: t - Duration::days(31),
            ..old.clone()
        };
        assert!(!has_recent_notification(
            &[stale],
            entity,
            NotificationType::StockExpiry,
            t
        ));

        // Different entity or type never suppresses
        let other_entity = RelatedEntity::Stock(Uuid::new_v4());
        assert!(!has_recent_notification(
            &records,
            other_entity,
            NotificationType::StockExpiry,
            t
        ));
        assert!(!has_recent_notification(
            &records,
            entity,
            NotificationType::LowStock,
            t
        ));

        // A cancelled record does not suppress
        old.cancel();
        assert!(!has_recent_notification(
            &[old],
            entity,
            NotificationType::StockExpiry,
            t
        ));
    }

    #[test]
    fn related_entity_round_trips_through_parts() {
        let id = Uuid::new_v4();
        for entity in [
            RelatedEntity::Medication(id),
            RelatedEntity::Prescription(id),
            RelatedEntity::Stock(id),
        ] {
            let rebuilt = RelatedEntity::from_parts(entity.type_tag(), entity.entity_id());
            assert_eq!(rebuilt, Some(entity));
        }
        assert_eq!(RelatedEntity::from_parts("invoice", id), None);
    }

    #[test]
    fn delivery_receipts_allowed_out_of_band() {
        // A receipt can arrive before the send confirmation is recorded
        let mut n = record(NotificationType::PrescriptionExpiry);
        assert!(n.mark_delivered(now()));
        assert_eq!(n.status, NotificationStatus::Delivered);

        // But never resurrects a read or cancelled record
        let mut read = record(NotificationType::PrescriptionExpiry);
        read.mark_read(now());
        assert!(!read.mark_delivered(now()));
        assert_eq!(read.status, NotificationStatus::Read);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Send,
        Deliver,
        Read,
        Fail,
        Retry,
        Cancel,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Send),
            Just(Op::Deliver),
            Just(Op::Read),
            Just(Op::Fail),
            Just(Op::Retry),
            Just(Op::Cancel),
        ]
    }

    proptest! {
        /// No sequence of operations pushes retry_count past max_retries.
        #[test]
        fn retry_count_never_exceeds_budget(ops in proptest::collection::vec(op_strategy(), 0..50)) {
            let mut n = record(NotificationType::MedicationExpiry);
            let t = now();
            for op in ops {
                match op {
                    Op::Send => { n.mark_sent(t); }
                    Op::Deliver => { n.mark_delivered(t); }
                    Op::Read => { n.mark_read(t); }
                    Op::Fail => { n.mark_failed("boom"); }
                    Op::Retry => { n.reset_for_retry(); }
                    Op::Cancel => { n.cancel(); }
                }
                prop_assert!(n.retry_count <= n.max_retries);
            }
        }

        /// Cancellation is terminal: once cancelled, the status never changes.
        #[test]
        fn cancelled_is_terminal(ops in proptest::collection::vec(op_strategy(), 0..50)) {
            let mut n = record(NotificationType::StockExpiry);
            n.cancel();
            let t = now();
            for op in ops {
                match op {
                    Op::Send => { n.mark_sent(t); }
                    Op::Deliver => { n.mark_delivered(t); }
                    Op::Read => { n.mark_read(t); }
                    Op::Fail => { n.mark_failed("boom"); }
                    Op::Retry => { n.reset_for_retry(); }
                    Op::Cancel => { n.cancel(); }
                }
                prop_assert_eq!(n.status, NotificationStatus::Cancelled);
            }
        }

        /// Suppression holds exactly inside the window.
        #[test]
        fn suppression_matches_window(age_days in 0i64..120) {
            let entity = RelatedEntity::Medication(Uuid::new_v4());
            let t = now();
            let old = NotificationRecord::new(
                None,
                NotificationType::MedicationExpiry,
                NotificationChannel::System,
                "s".to_string(),
                "m".to_string(),
                Some(entity),
                t - Duration::days(age_days),
            );
            let suppressed = has_recent_notification(
                &[old],
                entity,
                NotificationType::MedicationExpiry,
                t,
            );
            prop_assert_eq!(
                suppressed,
                age_days <= NotificationType::MedicationExpiry.dedup_window_days()
            );
        }
    }
}
