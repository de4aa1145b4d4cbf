//! HTTP handlers for medication endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{Medication, MedicationStatus};

use crate::error::AppResult;
use crate::services::medication::{
    CreateMedicationInput, MedicationService, UpdateMedicationInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MedicationListQuery {
    pub patient_id: Option<Uuid>,
}

pub async fn create_medication(
    State(state): State<AppState>,
    Json(input): Json<CreateMedicationInput>,
) -> AppResult<Json<Medication>> {
    let service = MedicationService::new(state.db);
    let medication = service.create_medication(input).await?;
    Ok(Json(medication))
}

pub async fn list_medications(
    State(state): State<AppState>,
    Query(query): Query<MedicationListQuery>,
) -> AppResult<Json<Vec<Medication>>> {
    let service = MedicationService::new(state.db);
    let medications = service.list_medications(query.patient_id).await?;
    Ok(Json(medications))
}

pub async fn get_medication(
    State(state): State<AppState>,
    Path(medication_id): Path<Uuid>,
) -> AppResult<Json<Medication>> {
    let service = MedicationService::new(state.db);
    let medication = service.get_medication(medication_id).await?;
    Ok(Json(medication))
}

pub async fn update_medication(
    State(state): State<AppState>,
    Path(medication_id): Path<Uuid>,
    Json(input): Json<UpdateMedicationInput>,
) -> AppResult<Json<Medication>> {
    let service = MedicationService::new(state.db);
    let medication = service.update_medication(medication_id, input).await?;
    Ok(Json(medication))
}

pub async fn activate_medication(
    State(state): State<AppState>,
    Path(medication_id): Path<Uuid>,
) -> AppResult<Json<Medication>> {
    let service = MedicationService::new(state.db);
    let medication = service
        .set_status(medication_id, MedicationStatus::Active)
        .await?;
    Ok(Json(medication))
}

pub async fn hold_medication(
    State(state): State<AppState>,
    Path(medication_id): Path<Uuid>,
) -> AppResult<Json<Medication>> {
    let service = MedicationService::new(state.db);
    let medication = service
        .set_status(medication_id, MedicationStatus::OnHold)
        .await?;
    Ok(Json(medication))
}

pub async fn discontinue_medication(
    State(state): State<AppState>,
    Path(medication_id): Path<Uuid>,
) -> AppResult<Json<Medication>> {
    let service = MedicationService::new(state.db);
    let medication = service
        .set_status(medication_id, MedicationStatus::Discontinued)
        .await?;
    Ok(Json(medication))
}

pub async fn complete_medication(
    State(state): State<AppState>,
    Path(medication_id): Path<Uuid>,
) -> AppResult<Json<Medication>> {
    let service = MedicationService::new(state.db);
    let medication = service
        .set_status(medication_id, MedicationStatus::Completed)
        .await?;
    Ok(Json(medication))
}

pub async fn delete_medication(
    State(state): State<AppState>,
    Path(medication_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let service = MedicationService::new(state.db);
    service.delete_medication(medication_id).await?;
    Ok(Json(serde_json::json!({ "deleted": medication_id })))
}
