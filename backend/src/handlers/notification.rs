//! HTTP handlers for notification endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::NotificationRecord;

use crate::error::AppResult;
use crate::services::notification::{CreateNotificationInput, NotificationService};
use crate::services::trigger::{NotificationCheckResult, NotificationTriggerService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub patient_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleInput {
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SendPendingResponse {
    pub sent: i32,
}

/// Create a notification
pub async fn create_notification(
    State(state): State<AppState>,
    Json(input): Json<CreateNotificationInput>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.create_notification(input).await?;
    Ok(Json(notification))
}

/// List notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> AppResult<Json<Vec<NotificationRecord>>> {
    let service = NotificationService::new(state.db, &state.config);
    let notifications = service
        .list_notifications(query.patient_id, query.limit.unwrap_or(100))
        .await?;
    Ok(Json(notifications))
}

/// Get a notification
pub async fn get_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.get_notification(notification_id).await?;
    Ok(Json(notification))
}

/// Defer a notification to a later instant
pub async fn schedule_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Json(input): Json<ScheduleInput>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.schedule_notification(notification_id, input.at).await?;
    Ok(Json(notification))
}

/// Send a notification now
pub async fn send_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.send_notification(notification_id).await?;
    Ok(Json(notification))
}

/// Retry a failed notification
pub async fn retry_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.retry_notification(notification_id).await?;
    Ok(Json(notification))
}

/// Cancel a pending notification
pub async fn cancel_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.cancel_notification(notification_id).await?;
    Ok(Json(notification))
}

/// Record a delivery receipt
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.mark_delivered(notification_id).await?;
    Ok(Json(notification))
}

/// Mark a notification as read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<NotificationRecord>> {
    let service = NotificationService::new(state.db, &state.config);
    let notification = service.mark_read(notification_id).await?;
    Ok(Json(notification))
}

/// Send everything that is ready to go
pub async fn send_pending_notifications(
    State(state): State<AppState>,
) -> AppResult<Json<SendPendingResponse>> {
    let service = NotificationService::new(state.db, &state.config);
    let sent = service.send_pending_notifications(100).await?;
    Ok(Json(SendPendingResponse { sent }))
}

/// Run the medication expiry scan
pub async fn trigger_medication_warnings(
    State(state): State<AppState>,
) -> AppResult<Json<i32>> {
    let service = NotificationTriggerService::new(state.db, &state.config);
    let count = service.trigger_medication_expiry_warnings().await?;
    Ok(Json(count))
}

/// Run the prescription expiry scan
pub async fn trigger_prescription_warnings(
    State(state): State<AppState>,
) -> AppResult<Json<i32>> {
    let service = NotificationTriggerService::new(state.db, &state.config);
    let count = service.trigger_prescription_expiry_warnings().await?;
    Ok(Json(count))
}

/// Run the stock expiry scan
pub async fn trigger_stock_warnings(State(state): State<AppState>) -> AppResult<Json<i32>> {
    let service = NotificationTriggerService::new(state.db, &state.config);
    let count = service.trigger_stock_expiry_warnings().await?;
    Ok(Json(count))
}

/// Run the low stock scan
pub async fn trigger_low_stock_warnings(State(state): State<AppState>) -> AppResult<Json<i32>> {
    let service = NotificationTriggerService::new(state.db, &state.config);
    let count = service.trigger_low_stock_warnings().await?;
    Ok(Json(count))
}

/// Run every trigger scan once
pub async fn run_all_triggers(
    State(state): State<AppState>,
) -> AppResult<Json<NotificationCheckResult>> {
    let service = NotificationTriggerService::new(state.db, &state.config);
    let result = service.run_all_triggers().await?;
    Ok(Json(result))
}
