//! Notification triggers: daily scans for expiring medications, expiring
//! prescriptions, and expiring or low stock
//!
//! Each scan suppresses duplicates through the notification service's
//! cool-down window and isolates failures, so one bad record never stops a
//! run. Re-running a scan is safe; dedup makes it idempotent within the
//! window.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{NotificationChannel, NotificationType, RelatedEntity};

use crate::config::Config;
use crate::error::AppResult;
use crate::services::notification::{CreateNotificationInput, NotificationService};

/// Trigger service running the daily scans
#[derive(Clone)]
pub struct NotificationTriggerService {
    db: PgPool,
    notifications: NotificationService,
    medication_warning_days: i64,
    prescription_warning_days: i64,
    stock_warning_days: i64,
}

/// Outcome of one full trigger run
#[derive(Debug, Clone, Serialize)]
pub struct NotificationCheckResult {
    pub medication_warnings: i32,
    pub prescription_warnings: i32,
    pub stock_expiry_warnings: i32,
    pub low_stock_warnings: i32,
    pub total: i32,
}

/// Build a medication expiry warning
fn medication_expiry_input(
    patient_id: Uuid,
    medication_id: Uuid,
    medication_name: &str,
    days_until: i64,
) -> CreateNotificationInput {
    CreateNotificationInput {
        patient_id: Some(patient_id),
        notification_type: NotificationType::MedicationExpiry,
        channel: NotificationChannel::Email,
        subject: format!("Medication expiring soon: {}", medication_name),
        message: format!(
            "Your medication '{}' will expire in {} days. Please contact the pharmacy for a replacement.",
            medication_name, days_until
        ),
        related_entity: Some(RelatedEntity::Medication(medication_id)),
        priority: None,
    }
}

/// Build a prescription expiry warning
fn prescription_expiry_input(
    patient_id: Uuid,
    prescription_id: Uuid,
    medication_name: &str,
    days_until: i64,
) -> CreateNotificationInput {
    CreateNotificationInput {
        patient_id: Some(patient_id),
        notification_type: NotificationType::PrescriptionExpiry,
        channel: NotificationChannel::Email,
        subject: format!("Prescription expiring soon: {}", medication_name),
        message: format!(
            "Your prescription for '{}' will expire in {} days. Please renew it with your doctor.",
            medication_name, days_until
        ),
        related_entity: Some(RelatedEntity::Prescription(prescription_id)),
        priority: None,
    }
}

/// Build a stock batch expiry warning for pharmacy staff
fn stock_expiry_input(
    batch_id: Uuid,
    product_name: &str,
    batch_number: &str,
    days_until: i64,
    quantity: i32,
) -> CreateNotificationInput {
    CreateNotificationInput {
        patient_id: None,
        notification_type: NotificationType::StockExpiry,
        channel: NotificationChannel::System,
        subject: format!("Stock batch expiring: {} ({})", product_name, batch_number),
        message: format!(
            "Batch '{}' of '{}' expires in {} days with {} units remaining.",
            batch_number, product_name, days_until, quantity
        ),
        related_entity: Some(RelatedEntity::Stock(batch_id)),
        priority: None,
    }
}

/// Build a low stock warning for pharmacy staff
fn low_stock_input(
    batch_id: Uuid,
    product_name: &str,
    batch_number: &str,
    quantity: i32,
    minimum: i32,
) -> CreateNotificationInput {
    CreateNotificationInput {
        patient_id: None,
        notification_type: NotificationType::LowStock,
        channel: NotificationChannel::System,
        subject: format!("Low stock: {} ({})", product_name, batch_number),
        message: format!(
            "Batch '{}' of '{}' is down to {} units (minimum {}).",
            batch_number, product_name, quantity, minimum
        ),
        related_entity: Some(RelatedEntity::Stock(batch_id)),
        priority: None,
    }
}

impl NotificationTriggerService {
    /// Create a new trigger service
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            notifications: NotificationService::new(db.clone(), config),
            db,
            medication_warning_days: config.notification.medication_warning_days,
            prescription_warning_days: config.notification.prescription_warning_days,
            stock_warning_days: config.notification.stock_warning_days,
        }
    }

    /// Attempts delivery right after a warning is created. A failure is
    /// already captured on the record (FAILED, retryable), so it is logged
    /// and the scan moves on.
    async fn try_send(&self, notification_id: Uuid) {
        if let Err(e) = self.notifications.send_notification(notification_id).await {
            tracing::error!("Failed to deliver notification {}: {}", notification_id, e);
        }
    }

    /// Warn patients about active medications expiring within the
    /// look-ahead window. Patients without a usable email address are
    /// skipped. Returns the number of notifications created.
    pub async fn trigger_medication_expiry_warnings(&self) -> AppResult<i32> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, NaiveDate)>(
            r#"
            SELECT m.id, m.patient_id, m.name, m.expiry_date
            FROM medications m
            JOIN patients p ON p.id = m.patient_id
            WHERE m.status = 'active'
              AND m.expiry_date > CURRENT_DATE
              AND m.expiry_date <= CURRENT_DATE + make_interval(days => $1)
              AND p.notifications_enabled = true
              AND p.email IS NOT NULL AND p.email <> ''
            ORDER BY m.expiry_date ASC
            "#,
        )
        .bind(self.medication_warning_days as i32)
        .fetch_all(&self.db)
        .await?;

        let today = chrono::Utc::now().date_naive();
        let mut count = 0;
        for (medication_id, patient_id, name, expiry_date) in rows {
            let entity = RelatedEntity::Medication(medication_id);
            if self
                .notifications
                .has_recent_notification(entity, NotificationType::MedicationExpiry)
                .await?
            {
                continue;
            }
            let days_until = shared::days_until(today, expiry_date);
            let input = medication_expiry_input(patient_id, medication_id, &name, days_until);
            match self.notifications.create_notification(input).await {
                Ok(notification) => {
                    count += 1;
                    self.try_send(notification.id).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to create medication expiry warning for {}: {}",
                        medication_id,
                        e
                    );
                }
            }
        }

        Ok(count)
    }

    /// Warn patients about active prescriptions expiring within the
    /// look-ahead window. Returns the number of notifications created.
    pub async fn trigger_prescription_expiry_warnings(&self) -> AppResult<i32> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, NaiveDate)>(
            r#"
            SELECT pr.id, pr.patient_id, pr.medication_name, pr.expiry_date
            FROM prescriptions pr
            JOIN patients p ON p.id = pr.patient_id
            WHERE pr.status = 'active'
              AND pr.expiry_date > CURRENT_DATE
              AND pr.expiry_date <= CURRENT_DATE + make_interval(days => $1)
              AND p.notifications_enabled = true
              AND p.email IS NOT NULL AND p.email <> ''
            ORDER BY pr.expiry_date ASC
            "#,
        )
        .bind(self.prescription_warning_days as i32)
        .fetch_all(&self.db)
        .await?;

        let today = chrono::Utc::now().date_naive();
        let mut count = 0;
        for (prescription_id, patient_id, medication_name, expiry_date) in rows {
            let entity = RelatedEntity::Prescription(prescription_id);
            if self
                .notifications
                .has_recent_notification(entity, NotificationType::PrescriptionExpiry)
                .await?
            {
                continue;
            }
            let days_until = shared::days_until(today, expiry_date);
            let input = prescription_expiry_input(
                patient_id,
                prescription_id,
                &medication_name,
                days_until,
            );
            match self.notifications.create_notification(input).await {
                Ok(notification) => {
                    count += 1;
                    self.try_send(notification.id).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to create prescription expiry warning for {}: {}",
                        prescription_id,
                        e
                    );
                }
            }
        }

        Ok(count)
    }

    /// Warn staff about stock batches expiring within the look-ahead
    /// window. Returns the number of notifications created.
    pub async fn trigger_stock_expiry_warnings(&self) -> AppResult<i32> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, NaiveDate, i32)>(
            r#"
            SELECT sb.id, pr.name, sb.batch_number, sb.expiry_date, sb.quantity
            FROM stock_batches sb
            JOIN products pr ON pr.id = sb.product_id
            WHERE sb.expiry_date > CURRENT_DATE
              AND sb.expiry_date <= CURRENT_DATE + make_interval(days => $1)
              AND sb.status NOT IN ('expired', 'damaged', 'recalled')
            ORDER BY sb.expiry_date ASC
            "#,
        )
        .bind(self.stock_warning_days as i32)
        .fetch_all(&self.db)
        .await?;

        let today = chrono::Utc::now().date_naive();
        let mut count = 0;
        for (batch_id, product_name, batch_number, expiry_date, quantity) in rows {
            let entity = RelatedEntity::Stock(batch_id);
            if self
                .notifications
                .has_recent_notification(entity, NotificationType::StockExpiry)
                .await?
            {
                continue;
            }
            let days_until = shared::days_until(today, expiry_date);
            let input =
                stock_expiry_input(batch_id, &product_name, &batch_number, days_until, quantity);
            match self.notifications.create_notification(input).await {
                Ok(notification) => {
                    count += 1;
                    self.try_send(notification.id).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to create stock expiry warning for {}: {}",
                        batch_id,
                        e
                    );
                }
            }
        }

        Ok(count)
    }

    /// Warn staff about batches below their minimum stock level.
    /// Returns the number of notifications created.
    pub async fn trigger_low_stock_warnings(&self) -> AppResult<i32> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, i32, i32)>(
            r#"
            SELECT sb.id, pr.name, sb.batch_number, sb.quantity, sb.minimum_stock_level
            FROM stock_batches sb
            JOIN products pr ON pr.id = sb.product_id
            WHERE sb.quantity > 0 AND sb.quantity < sb.minimum_stock_level
              AND sb.status IN ('available', 'low_stock')
            ORDER BY sb.quantity ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut count = 0;
        for (batch_id, product_name, batch_number, quantity, minimum) in rows {
            let entity = RelatedEntity::Stock(batch_id);
            if self
                .notifications
                .has_recent_notification(entity, NotificationType::LowStock)
                .await?
            {
                continue;
            }
            let input = low_stock_input(batch_id, &product_name, &batch_number, quantity, minimum);
            match self.notifications.create_notification(input).await {
                Ok(notification) => {
                    count += 1;
                    self.try_send(notification.id).await;
                }
                Err(e) => {
                    tracing::error!("Failed to create low stock warning for {}: {}", batch_id, e);
                }
            }
        }

        Ok(count)
    }

    /// Run every scan once and report the counts
    pub async fn run_all_triggers(&self) -> AppResult<NotificationCheckResult> {
        let medication_warnings = self.trigger_medication_expiry_warnings().await?;
        let prescription_warnings = self.trigger_prescription_expiry_warnings().await?;
        let stock_expiry_warnings = self.trigger_stock_expiry_warnings().await?;
        let low_stock_warnings = self.trigger_low_stock_warnings().await?;

        Ok(NotificationCheckResult {
            medication_warnings,
            prescription_warnings,
            stock_expiry_warnings,
            low_stock_warnings,
            total: medication_warnings
                + prescription_warnings
                + stock_expiry_warnings
                + low_stock_warnings,
        })
    }
}
