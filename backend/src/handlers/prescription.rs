//! HTTP handlers for prescription endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{Prescription, PrescriptionStatus};

use crate::error::AppResult;
use crate::services::prescription::{
    CreatePrescriptionInput, PrescriptionService, UpdatePrescriptionInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PrescriptionListQuery {
    pub patient_id: Option<Uuid>,
}

pub async fn create_prescription(
    State(state): State<AppState>,
    Json(input): Json<CreatePrescriptionInput>,
) -> AppResult<Json<Prescription>> {
    let service = PrescriptionService::new(state.db);
    let prescription = service.create_prescription(input).await?;
    Ok(Json(prescription))
}

pub async fn list_prescriptions(
    State(state): State<AppState>,
    Query(query): Query<PrescriptionListQuery>,
) -> AppResult<Json<Vec<Prescription>>> {
    let service = PrescriptionService::new(state.db);
    let prescriptions = service.list_prescriptions(query.patient_id).await?;
    Ok(Json(prescriptions))
}

pub async fn get_prescription(
    State(state): State<AppState>,
    Path(prescription_id): Path<Uuid>,
) -> AppResult<Json<Prescription>> {
    let service = PrescriptionService::new(state.db);
    let prescription = service.get_prescription(prescription_id).await?;
    Ok(Json(prescription))
}

pub async fn update_prescription(
    State(state): State<AppState>,
    Path(prescription_id): Path<Uuid>,
    Json(input): Json<UpdatePrescriptionInput>,
) -> AppResult<Json<Prescription>> {
    let service = PrescriptionService::new(state.db);
    let prescription = service.update_prescription(prescription_id, input).await?;
    Ok(Json(prescription))
}

pub async fn complete_prescription(
    State(state): State<AppState>,
    Path(prescription_id): Path<Uuid>,
) -> AppResult<Json<Prescription>> {
    let service = PrescriptionService::new(state.db);
    let prescription = service
        .set_status(prescription_id, PrescriptionStatus::Completed)
        .await?;
    Ok(Json(prescription))
}

pub async fn cancel_prescription(
    State(state): State<AppState>,
    Path(prescription_id): Path<Uuid>,
) -> AppResult<Json<Prescription>> {
    let service = PrescriptionService::new(state.db);
    let prescription = service
        .set_status(prescription_id, PrescriptionStatus::Cancelled)
        .await?;
    Ok(Json(prescription))
}

pub async fn delete_prescription(
    State(state): State<AppState>,
    Path(prescription_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let service = PrescriptionService::new(state.db);
    service.delete_prescription(prescription_id).await?;
    Ok(Json(serde_json::json!({ "deleted": prescription_id })))
}
