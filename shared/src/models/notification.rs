//! Notification domain model
//!
//! A `NotificationRecord` moves through a small state machine:
//!
//! ```text
//! PENDING ─┬─> SCHEDULED ─> SENT ─> DELIVERED ─> READ
//!          ├─> SENT ...
//!          ├─> CANCELLED
//!          └─> FAILED ─(retry, bounded)─> PENDING
//! ```
//!
//! Transition methods are no-ops when the record is not in an eligible state
//! and report whether they took effect, so callers can surface their own
//! errors without the model guessing at HTTP semantics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// What the notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    MedicationExpiry,
    PrescriptionExpiry,
    StockExpiry,
    LowStock,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::MedicationExpiry => "medication_expiry",
            NotificationType::PrescriptionExpiry => "prescription_expiry",
            NotificationType::StockExpiry => "stock_expiry",
            NotificationType::LowStock => "low_stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "medication_expiry" => Some(NotificationType::MedicationExpiry),
            "prescription_expiry" => Some(NotificationType::PrescriptionExpiry),
            "stock_expiry" => Some(NotificationType::StockExpiry),
            "low_stock" => Some(NotificationType::LowStock),
            _ => None,
        }
    }

    /// Cool-down window for duplicate suppression. Stock expiry warnings use
    /// a longer window because the look-ahead horizon is months, not days.
    pub fn dedup_window_days(&self) -> i64 {
        match self {
            NotificationType::MedicationExpiry => 7,
            NotificationType::PrescriptionExpiry => 7,
            NotificationType::StockExpiry => 30,
            NotificationType::LowStock => 7,
        }
    }

    /// 1 (lowest) to 5 (urgent)
    pub fn default_priority(&self) -> i32 {
        match self {
            NotificationType::MedicationExpiry => 4,
            NotificationType::PrescriptionExpiry => 4,
            NotificationType::StockExpiry => 3,
            NotificationType::LowStock => 3,
        }
    }
}

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    System,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
            NotificationChannel::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(NotificationChannel::Email),
            "sms" => Some(NotificationChannel::Sms),
            "system" => Some(NotificationChannel::System),
            _ => None,
        }
    }
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Scheduled,
    Sent,
    Delivered,
    Read,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Scheduled => "scheduled",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Read => "read",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NotificationStatus::Pending),
            "scheduled" => Some(NotificationStatus::Scheduled),
            "sent" => Some(NotificationStatus::Sent),
            "delivered" => Some(NotificationStatus::Delivered),
            "read" => Some(NotificationStatus::Read),
            "failed" => Some(NotificationStatus::Failed),
            "cancelled" => Some(NotificationStatus::Cancelled),
            _ => None,
        }
    }
}

/// The entity a notification refers to. Carrying the kind alongside the id
/// keeps dedup queries from mixing, say, a stock batch with a prescription
/// that happens to share a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RelatedEntity {
    Medication(Uuid),
    Prescription(Uuid),
    Stock(Uuid),
}

impl RelatedEntity {
    pub fn entity_id(&self) -> Uuid {
        match self {
            RelatedEntity::Medication(id)
            | RelatedEntity::Prescription(id)
            | RelatedEntity::Stock(id) => *id,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            RelatedEntity::Medication(_) => "medication",
            RelatedEntity::Prescription(_) => "prescription",
            RelatedEntity::Stock(_) => "stock",
        }
    }

    pub fn from_parts(tag: &str, id: Uuid) -> Option<Self> {
        match tag {
            "medication" => Some(RelatedEntity::Medication(id)),
            "prescription" => Some(RelatedEntity::Prescription(id)),
            "stock" => Some(RelatedEntity::Stock(id)),
            _ => None,
        }
    }
}

/// One notification and its delivery history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub patient_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub channel: NotificationChannel,
    pub priority: i32,
    pub subject: String,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
    pub status: NotificationStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        patient_id: Option<Uuid>,
        notification_type: NotificationType,
        channel: NotificationChannel,
        subject: String,
        message: String,
        related_entity: Option<RelatedEntity>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            notification_type,
            channel,
            priority: notification_type.default_priority(),
            subject,
            message,
            related_entity,
            status: NotificationStatus::Pending,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            scheduled_at: None,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// PENDING without a schedule, or SCHEDULED/PENDING whose scheduled time
    /// has arrived.
    pub fn is_ready_to_send(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            NotificationStatus::Pending | NotificationStatus::Scheduled => {
                self.scheduled_at.map_or(true, |at| at <= now)
            }
            _ => false,
        }
    }

    pub fn can_be_sent(&self) -> bool {
        matches!(
            self.status,
            NotificationStatus::Pending | NotificationStatus::Scheduled
        )
    }

    pub fn can_be_retried(&self) -> bool {
        self.status == NotificationStatus::Failed && self.retry_count < self.max_retries
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status == NotificationStatus::Pending
    }

    /// Defers delivery to a later instant. Only a PENDING record can be
    /// scheduled.
    pub fn schedule(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != NotificationStatus::Pending {
            return false;
        }
        self.status = NotificationStatus::Scheduled;
        self.scheduled_at = Some(at);
        true
    }

    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> bool {
        if !self.can_be_sent() {
            return false;
        }
        self.status = NotificationStatus::Sent;
        self.sent_at = Some(now);
        self.error_message = None;
        true
    }

    /// Delivery receipts can arrive out of band, so any non-terminal record
    /// accepts them.
    pub fn mark_delivered(&mut self, now: DateTime<Utc>) -> bool {
        if matches!(
            self.status,
            NotificationStatus::Cancelled | NotificationStatus::Read
        ) {
            return false;
        }
        self.status = NotificationStatus::Delivered;
        self.delivered_at = Some(now);
        true
    }

    pub fn mark_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == NotificationStatus::Cancelled {
            return false;
        }
        self.status = NotificationStatus::Read;
        self.read_at = Some(now);
        true
    }

    pub fn mark_failed(&mut self, reason: &str) -> bool {
        if matches!(
            self.status,
            NotificationStatus::Cancelled | NotificationStatus::Read
        ) {
            return false;
        }
        self.status = NotificationStatus::Failed;
        self.error_message = Some(reason.to_string());
        true
    }

    /// Puts a FAILED record back in the queue, consuming one retry. No-op
    /// once the retry budget is exhausted.
    pub fn reset_for_retry(&mut self) -> bool {
        if !self.can_be_retried() {
            return false;
        }
        self.status = NotificationStatus::Pending;
        self.retry_count += 1;
        self.error_message = None;
        true
    }

    /// Withdraws a notification that has not left the queue yet.
    pub fn cancel(&mut self) -> bool {
        if !self.can_be_cancelled() {
            return false;
        }
        self.status = NotificationStatus::Cancelled;
        true
    }
}

/// Duplicate suppression: true when `records` already holds a notification of
/// the given type for the same entity created inside the type's cool-down
/// window. Cancelled records do not suppress, a fresh warning may still go
/// out.
pub fn has_recent_notification(
    records: &[NotificationRecord],
    entity: RelatedEntity,
    notification_type: NotificationType,
    now: DateTime<Utc>,
) -> bool {
    let window = Duration::days(notification_type.dedup_window_days());
    records.iter().any(|n| {
        n.notification_type == notification_type
            && n.related_entity == Some(entity)
            && n.status != NotificationStatus::Cancelled
            && now - n.created_at <= window
    })
}
