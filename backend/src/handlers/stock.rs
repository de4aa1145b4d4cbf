//! HTTP handlers for stock batch endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::StockBatch;

use crate::error::AppResult;
use crate::services::stock::{AdjustQuantityInput, CreateStockBatchInput, StockService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchListQuery {
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityQuery {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub within_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub product_id: Uuid,
    pub requested: i32,
    pub available: bool,
}

/// Receive a new stock batch
pub async fn create_batch(
    State(state): State<AppState>,
    Json(input): Json<CreateStockBatchInput>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.create_batch(input).await?;
    Ok(Json(batch))
}

/// List stock batches
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> AppResult<Json<Vec<StockBatch>>> {
    let service = StockService::new(state.db);
    let batches = service.list_batches(query.product_id).await?;
    Ok(Json(batches))
}

/// Get a stock batch
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.get_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Deduct quantity from a batch
pub async fn deduct_quantity(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<AdjustQuantityInput>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.deduct_quantity(batch_id, input.amount).await?;
    Ok(Json(batch))
}

/// Add quantity to a batch
pub async fn add_quantity(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<AdjustQuantityInput>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.add_quantity(batch_id, input.amount).await?;
    Ok(Json(batch))
}

/// Mark a batch as expired
pub async fn mark_expired(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.mark_expired(batch_id).await?;
    Ok(Json(batch))
}

/// Mark a batch as damaged
pub async fn mark_damaged(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.mark_damaged(batch_id).await?;
    Ok(Json(batch))
}

/// Mark a batch as recalled
pub async fn mark_recalled(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.mark_recalled(batch_id).await?;
    Ok(Json(batch))
}

/// Reserve a batch
pub async fn mark_reserved(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.mark_reserved(batch_id).await?;
    Ok(Json(batch))
}

/// Release a reservation
pub async fn release_reservation(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.release_reservation(batch_id).await?;
    Ok(Json(batch))
}

/// Pick the optimal batch for a sale (first expire, first out)
pub async fn allocate_batch(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<QuantityQuery>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.find_optimal_batch(product_id, query.quantity).await?;
    Ok(Json(batch))
}

/// Aggregate availability check for a product
pub async fn check_availability(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<QuantityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let service = StockService::new(state.db);
    let available = service.check_availability(product_id, query.quantity).await?;
    Ok(Json(AvailabilityResponse {
        product_id,
        requested: query.quantity,
        available,
    }))
}

/// List batches expiring within the look-ahead window
pub async fn list_expiring_batches(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<Json<Vec<StockBatch>>> {
    let within_days = query
        .within_days
        .unwrap_or(state.config.notification.stock_warning_days);
    let service = StockService::new(state.db);
    let batches = service.find_expiring_batches(within_days).await?;
    Ok(Json(batches))
}

/// List batches below their minimum stock level
pub async fn list_low_stock_batches(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StockBatch>>> {
    let service = StockService::new(state.db);
    let batches = service.find_low_stock_batches().await?;
    Ok(Json(batches))
}

/// Delete a batch
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let service = StockService::new(state.db);
    service.delete_batch(batch_id).await?;
    Ok(Json(serde_json::json!({ "deleted": batch_id })))
}
