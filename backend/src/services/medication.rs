//! Medication records service

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{Medication, MedicationStatus};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct MedicationService {
    db: PgPool,
}

/// Input for recording a dispensed medication
#[derive(Debug, Deserialize)]
pub struct CreateMedicationInput {
    pub patient_id: Uuid,
    pub name: String,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for updating a medication record
#[derive(Debug, Deserialize)]
pub struct UpdateMedicationInput {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, FromRow)]
struct MedicationRow {
    id: Uuid,
    patient_id: Uuid,
    name: String,
    dosage: Option<String>,
    manufacturer: Option<String>,
    batch_number: Option<String>,
    expiry_date: Option<NaiveDate>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MedicationRow {
    fn into_model(self) -> AppResult<Medication> {
        let status = MedicationStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("unknown medication status: {}", self.status))
        })?;
        Ok(Medication {
            id: self.id,
            patient_id: self.patient_id,
            name: self.name,
            dosage: self.dosage,
            manufacturer: self.manufacturer,
            batch_number: self.batch_number,
            expiry_date: self.expiry_date,
            status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const MEDICATION_COLUMNS: &str = "id, patient_id, name, dosage, manufacturer, batch_number, \
     expiry_date, status, notes, created_at, updated_at";

impl MedicationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_medication(&self, input: CreateMedicationInput) -> AppResult<Medication> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name must not be empty".to_string(),
            });
        }

        let patient_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1)")
                .bind(input.patient_id)
                .fetch_one(&self.db)
                .await?;

        if !patient_exists {
            return Err(AppError::NotFound("Patient".to_string()));
        }

        let row = sqlx::query_as::<_, MedicationRow>(&format!(
            r#"
            INSERT INTO medications (patient_id, name, dosage, manufacturer, batch_number, expiry_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(input.patient_id)
        .bind(&input.name)
        .bind(&input.dosage)
        .bind(&input.manufacturer)
        .bind(&input.batch_number)
        .bind(input.expiry_date)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    pub async fn get_medication(&self, medication_id: Uuid) -> AppResult<Medication> {
        let row = sqlx::query_as::<_, MedicationRow>(&format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = $1"
        ))
        .bind(medication_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medication".to_string()))?;

        row.into_model()
    }

    /// List medications, optionally filtered by patient, earliest expiry
    /// first
    pub async fn list_medications(&self, patient_id: Option<Uuid>) -> AppResult<Vec<Medication>> {
        let rows = match patient_id {
            Some(pid) => {
                sqlx::query_as::<_, MedicationRow>(&format!(
                    r#"
                    SELECT {MEDICATION_COLUMNS} FROM medications
                    WHERE patient_id = $1
                    ORDER BY expiry_date ASC NULLS LAST
                    "#
                ))
                .bind(pid)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, MedicationRow>(&format!(
                    "SELECT {MEDICATION_COLUMNS} FROM medications ORDER BY expiry_date ASC NULLS LAST"
                ))
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(MedicationRow::into_model).collect()
    }

    pub async fn update_medication(
        &self,
        medication_id: Uuid,
        input: UpdateMedicationInput,
    ) -> AppResult<Medication> {
        let row = sqlx::query_as::<_, MedicationRow>(&format!(
            r#"
            UPDATE medications SET
                name = COALESCE($2, name),
                dosage = COALESCE($3, dosage),
                manufacturer = COALESCE($4, manufacturer),
                batch_number = COALESCE($5, batch_number),
                expiry_date = COALESCE($6, expiry_date),
                notes = COALESCE($7, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(medication_id)
        .bind(&input.name)
        .bind(&input.dosage)
        .bind(&input.manufacturer)
        .bind(&input.batch_number)
        .bind(input.expiry_date)
        .bind(&input.notes)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medication".to_string()))?;

        row.into_model()
    }

    /// Move a medication through its lifecycle. DISCONTINUED and COMPLETED
    /// are end states; ON_HOLD can be resumed to ACTIVE.
    pub async fn set_status(
        &self,
        medication_id: Uuid,
        status: MedicationStatus,
    ) -> AppResult<Medication> {
        let current = self.get_medication(medication_id).await?;
        if current.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "medication {} is {} and cannot change status",
                medication_id,
                current.status.as_str()
            )));
        }

        let row = sqlx::query_as::<_, MedicationRow>(&format!(
            r#"
            UPDATE medications SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(medication_id)
        .bind(status.as_str())
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    pub async fn delete_medication(&self, medication_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM medications WHERE id = $1")
            .bind(medication_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Medication".to_string()));
        }

        Ok(())
    }
}
