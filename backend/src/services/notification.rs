//! Notification service: creation, delivery, retries and lifecycle
//!
//! Records move PENDING -> SCHEDULED -> SENT -> DELIVERED -> READ, with
//! FAILED re-entering the queue through a bounded retry and CANCELLED only
//! reachable from PENDING. Delivery is channel-specific: email goes through
//! the email client, SMS is a stub, system notifications are logged.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{
    NotificationChannel, NotificationRecord, NotificationStatus, NotificationType, RelatedEntity,
};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::email::EmailClient;

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    email_client: Option<EmailClient>,
}

/// Input for creating a notification
#[derive(Debug, Deserialize)]
pub struct CreateNotificationInput {
    pub patient_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub channel: NotificationChannel,
    pub subject: String,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
    pub priority: Option<i32>,
}

/// Row for notification queries; enums are stored as text
#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    patient_id: Option<Uuid>,
    notification_type: String,
    channel: String,
    priority: i32,
    subject: String,
    message: String,
    related_entity_type: Option<String>,
    related_entity_id: Option<Uuid>,
    status: String,
    retry_count: i32,
    max_retries: i32,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_model(self) -> AppResult<NotificationRecord> {
        let notification_type = NotificationType::parse(&self.notification_type)
            .ok_or_else(|| {
                AppError::Internal(format!("unknown notification type: {}", self.notification_type))
            })?;
        let channel = NotificationChannel::parse(&self.channel).ok_or_else(|| {
            AppError::Internal(format!("unknown notification channel: {}", self.channel))
        })?;
        let status = NotificationStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("unknown notification status: {}", self.status))
        })?;
        let related_entity = match (self.related_entity_type.as_deref(), self.related_entity_id) {
            (Some(tag), Some(id)) => Some(RelatedEntity::from_parts(tag, id).ok_or_else(|| {
                AppError::Internal(format!("unknown related entity type: {}", tag))
            })?),
            _ => None,
        };

        Ok(NotificationRecord {
            id: self.id,
            patient_id: self.patient_id,
            notification_type,
            channel,
            priority: self.priority,
            subject: self.subject,
            message: self.message,
            related_entity,
            status,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            scheduled_at: self.scheduled_at,
            sent_at: self.sent_at,
            delivered_at: self.delivered_at,
            read_at: self.read_at,
            error_message: self.error_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const NOTIFICATION_COLUMNS: &str = "id, patient_id, notification_type, channel, priority, \
     subject, message, related_entity_type, related_entity_id, status, retry_count, \
     max_retries, scheduled_at, sent_at, delivered_at, read_at, error_message, \
     created_at, updated_at";

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            email_client: EmailClient::from_config(&config.email),
        }
    }

    /// Create with an explicit email client
    pub fn with_email_client(db: PgPool, email_client: EmailClient) -> Self {
        Self {
            db,
            email_client: Some(email_client),
        }
    }

    /// Create a notification in PENDING
    pub async fn create_notification(
        &self,
        input: CreateNotificationInput,
    ) -> AppResult<NotificationRecord> {
        if input.subject.trim().is_empty() {
            return Err(AppError::Validation {
                field: "subject".to_string(),
                message: "Subject must not be empty".to_string(),
            });
        }

        // Email needs a patient with an address on file and opt-in
        if input.channel == NotificationChannel::Email {
            let patient_id = input.patient_id.ok_or_else(|| AppError::Validation {
                field: "patient_id".to_string(),
                message: "Email notifications require a patient".to_string(),
            })?;
            if self.patient_email(patient_id).await?.is_none() {
                return Err(AppError::Validation {
                    field: "channel".to_string(),
                    message: "Patient cannot receive email notifications".to_string(),
                });
            }
        }

        let priority = input
            .priority
            .unwrap_or_else(|| input.notification_type.default_priority());

        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (
                patient_id, notification_type, channel, priority, subject, message,
                related_entity_type, related_entity_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(input.patient_id)
        .bind(input.notification_type.as_str())
        .bind(input.channel.as_str())
        .bind(priority)
        .bind(&input.subject)
        .bind(&input.message)
        .bind(input.related_entity.map(|e| e.type_tag()))
        .bind(input.related_entity.map(|e| e.entity_id()))
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    /// Get a notification by id
    pub async fn get_notification(&self, notification_id: Uuid) -> AppResult<NotificationRecord> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(notification_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification".to_string()))?;

        row.into_model()
    }

    /// List notifications, optionally filtered by patient, newest first
    pub async fn list_notifications(
        &self,
        patient_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<NotificationRecord>> {
        let rows = match patient_id {
            Some(pid) => {
                sqlx::query_as::<_, NotificationRow>(&format!(
                    r#"
                    SELECT {NOTIFICATION_COLUMNS} FROM notifications
                    WHERE patient_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#
                ))
                .bind(pid)
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, NotificationRow>(&format!(
                    r#"
                    SELECT {NOTIFICATION_COLUMNS} FROM notifications
                    ORDER BY created_at DESC
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(NotificationRow::into_model).collect()
    }

    /// Defer a PENDING notification to a later instant
    pub async fn schedule_notification(
        &self,
        notification_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<NotificationRecord> {
        let mut notification = self.get_notification(notification_id).await?;
        if !notification.schedule(at) {
            return Err(AppError::InvalidStateTransition(format!(
                "notification {} is {} and cannot be scheduled",
                notification_id,
                notification.status.as_str()
            )));
        }
        self.persist(&notification).await
    }

    /// Send a notification through its channel. On delivery failure the
    /// record is marked FAILED (still retryable) and the error propagates.
    pub async fn send_notification(&self, notification_id: Uuid) -> AppResult<NotificationRecord> {
        let mut notification = self.get_notification(notification_id).await?;

        if !notification.can_be_sent() {
            return Err(AppError::InvalidStateTransition(format!(
                "notification {} is {} and cannot be sent",
                notification_id,
                notification.status.as_str()
            )));
        }

        let delivery = self.deliver(&notification).await;

        match delivery {
            Ok(()) => {
                notification.mark_sent(Utc::now());
                self.persist(&notification).await
            }
            Err(reason) => {
                notification.mark_failed(&reason);
                self.persist(&notification).await?;
                Err(AppError::DeliveryError(reason))
            }
        }
    }

    /// Put a FAILED notification back in the queue and send it again
    pub async fn retry_notification(&self, notification_id: Uuid) -> AppResult<NotificationRecord> {
        let mut notification = self.get_notification(notification_id).await?;

        if !notification.can_be_retried() {
            return Err(AppError::RetryNotAllowed(format!(
                "notification {} is {} with {}/{} retries used",
                notification_id,
                notification.status.as_str(),
                notification.retry_count,
                notification.max_retries
            )));
        }

        notification.reset_for_retry();
        self.persist(&notification).await?;
        self.send_notification(notification_id).await
    }

    /// Cancel a notification that has not left the queue
    pub async fn cancel_notification(&self, notification_id: Uuid) -> AppResult<NotificationRecord> {
        let mut notification = self.get_notification(notification_id).await?;

        if !notification.cancel() {
            return Err(AppError::InvalidStateTransition(format!(
                "notification {} is {} and cannot be cancelled",
                notification_id,
                notification.status.as_str()
            )));
        }
        self.persist(&notification).await
    }

    /// Record a delivery receipt
    pub async fn mark_delivered(&self, notification_id: Uuid) -> AppResult<NotificationRecord> {
        let mut notification = self.get_notification(notification_id).await?;
        if !notification.mark_delivered(Utc::now()) {
            return Err(AppError::InvalidStateTransition(format!(
                "notification {} is {} and cannot be marked delivered",
                notification_id,
                notification.status.as_str()
            )));
        }
        self.persist(&notification).await
    }

    /// Record that the recipient has read the notification
    pub async fn mark_read(&self, notification_id: Uuid) -> AppResult<NotificationRecord> {
        let mut notification = self.get_notification(notification_id).await?;
        if !notification.mark_read(Utc::now()) {
            return Err(AppError::InvalidStateTransition(format!(
                "notification {} is {} and cannot be marked read",
                notification_id,
                notification.status.as_str()
            )));
        }
        self.persist(&notification).await
    }

    /// Send every notification that is ready, highest priority first. One
    /// failing notification does not stop the batch. Returns the number
    /// actually sent.
    pub async fn send_pending_notifications(&self, batch_size: i64) -> AppResult<i32> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE status IN ('pending', 'scheduled')
            AND (scheduled_at IS NULL OR scheduled_at <= NOW())
            ORDER BY priority DESC, created_at ASC
            LIMIT $1
            "#
        ))
        .bind(batch_size)
        .fetch_all(&self.db)
        .await?;

        let mut sent_count = 0;
        for row in rows {
            let id = row.id;
            match self.send_notification(id).await {
                Ok(_) => sent_count += 1,
                Err(e) => {
                    // Log error but continue processing
                    tracing::error!("Failed to send notification {}: {}", id, e);
                }
            }
        }

        Ok(sent_count)
    }

    /// Duplicate suppression: is there already a non-cancelled notification
    /// of this type for this entity inside the type's cool-down window?
    pub async fn has_recent_notification(
        &self,
        entity: RelatedEntity,
        notification_type: NotificationType,
    ) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE related_entity_type = $1 AND related_entity_id = $2
                AND notification_type = $3
                AND status <> 'cancelled'
                AND created_at > NOW() - make_interval(days => $4)
            )
            "#,
        )
        .bind(entity.type_tag())
        .bind(entity.entity_id())
        .bind(notification_type.as_str())
        .bind(notification_type.dedup_window_days() as i32)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn deliver(&self, notification: &NotificationRecord) -> Result<(), String> {
        match notification.channel {
            NotificationChannel::Email => {
                let patient_id = notification
                    .patient_id
                    .ok_or_else(|| "email notification has no patient".to_string())?;
                let email = self
                    .patient_email(patient_id)
                    .await
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| "patient cannot receive email".to_string())?;
                let client = self
                    .email_client
                    .as_ref()
                    .ok_or_else(|| "email client not configured".to_string())?;
                client
                    .send_email(&email, &notification.subject, &notification.message)
                    .await
            }
            NotificationChannel::Sms => {
                // SMS delivery is not wired up yet; accept and log
                tracing::info!(
                    "SMS notification {} accepted (delivery stubbed): {}",
                    notification.id,
                    notification.subject
                );
                Ok(())
            }
            NotificationChannel::System => {
                tracing::info!(
                    "System notification {}: {}",
                    notification.id,
                    notification.subject
                );
                Ok(())
            }
        }
    }

    /// Address for a patient who can receive email, `None` otherwise
    async fn patient_email(&self, patient_id: Uuid) -> AppResult<Option<String>> {
        let row = sqlx::query_as::<_, (Option<String>, bool)>(
            "SELECT email, notifications_enabled FROM patients WHERE id = $1",
        )
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient".to_string()))?;

        match row {
            (Some(email), true) if !email.is_empty() => Ok(Some(email)),
            _ => Ok(None),
        }
    }

    async fn persist(&self, notification: &NotificationRecord) -> AppResult<NotificationRecord> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications
            SET status = $1, retry_count = $2, scheduled_at = $3, sent_at = $4,
                delivered_at = $5, read_at = $6, error_message = $7, updated_at = NOW()
            WHERE id = $8
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification.status.as_str())
        .bind(notification.retry_count)
        .bind(notification.scheduled_at)
        .bind(notification.sent_at)
        .bind(notification.delivered_at)
        .bind(notification.read_at)
        .bind(&notification.error_message)
        .bind(notification.id)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }
}
