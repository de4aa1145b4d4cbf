//! Prescription records service

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{Prescription, PrescriptionStatus};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PrescriptionService {
    db: PgPool,
}

/// Input for recording a prescription
#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionInput {
    pub patient_id: Uuid,
    pub medication_name: String,
    pub dosage_instructions: Option<String>,
    pub quantity: i32,
    pub issued_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

/// Input for updating a prescription
#[derive(Debug, Deserialize)]
pub struct UpdatePrescriptionInput {
    pub medication_name: Option<String>,
    pub dosage_instructions: Option<String>,
    pub quantity: Option<i32>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct PrescriptionRow {
    id: Uuid,
    patient_id: Uuid,
    medication_name: String,
    dosage_instructions: Option<String>,
    quantity: i32,
    issued_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrescriptionRow {
    fn into_model(self) -> AppResult<Prescription> {
        let status = PrescriptionStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("unknown prescription status: {}", self.status))
        })?;
        Ok(Prescription {
            id: self.id,
            patient_id: self.patient_id,
            medication_name: self.medication_name,
            dosage_instructions: self.dosage_instructions,
            quantity: self.quantity,
            issued_date: self.issued_date,
            expiry_date: self.expiry_date,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PRESCRIPTION_COLUMNS: &str = "id, patient_id, medication_name, dosage_instructions, \
     quantity, issued_date, expiry_date, status, created_at, updated_at";

impl PrescriptionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_prescription(
        &self,
        input: CreatePrescriptionInput,
    ) -> AppResult<Prescription> {
        if input.medication_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "medication_name".to_string(),
                message: "Medication name must not be empty".to_string(),
            });
        }
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
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

        let issued_date = input.issued_date.unwrap_or_else(|| Utc::now().date_naive());

        let row = sqlx::query_as::<_, PrescriptionRow>(&format!(
            r#"
            INSERT INTO prescriptions (
                patient_id, medication_name, dosage_instructions, quantity, issued_date, expiry_date
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRESCRIPTION_COLUMNS}
            "#
        ))
        .bind(input.patient_id)
        .bind(&input.medication_name)
        .bind(&input.dosage_instructions)
        .bind(input.quantity)
        .bind(issued_date)
        .bind(input.expiry_date)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    pub async fn get_prescription(&self, prescription_id: Uuid) -> AppResult<Prescription> {
        let row = sqlx::query_as::<_, PrescriptionRow>(&format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = $1"
        ))
        .bind(prescription_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Prescription".to_string()))?;

        row.into_model()
    }

    /// List prescriptions, optionally filtered by patient, newest first
    pub async fn list_prescriptions(
        &self,
        patient_id: Option<Uuid>,
    ) -> AppResult<Vec<Prescription>> {
        let rows = match patient_id {
            Some(pid) => {
                sqlx::query_as::<_, PrescriptionRow>(&format!(
                    r#"
                    SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
                    WHERE patient_id = $1
                    ORDER BY issued_date DESC
                    "#
                ))
                .bind(pid)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, PrescriptionRow>(&format!(
                    "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions ORDER BY issued_date DESC"
                ))
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(PrescriptionRow::into_model).collect()
    }

    pub async fn update_prescription(
        &self,
        prescription_id: Uuid,
        input: UpdatePrescriptionInput,
    ) -> AppResult<Prescription> {
        if let Some(quantity) = input.quantity {
            if quantity <= 0 {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Quantity must be positive".to_string(),
                });
            }
        }

        let row = sqlx::query_as::<_, PrescriptionRow>(&format!(
            r#"
            UPDATE prescriptions SET
                medication_name = COALESCE($2, medication_name),
                dosage_instructions = COALESCE($3, dosage_instructions),
                quantity = COALESCE($4, quantity),
                expiry_date = COALESCE($5, expiry_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRESCRIPTION_COLUMNS}
            "#
        ))
        .bind(prescription_id)
        .bind(&input.medication_name)
        .bind(&input.dosage_instructions)
        .bind(input.quantity)
        .bind(input.expiry_date)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Prescription".to_string()))?;

        row.into_model()
    }

    /// Move a prescription to COMPLETED or CANCELLED. Only an ACTIVE
    /// prescription can change status.
    pub async fn set_status(
        &self,
        prescription_id: Uuid,
        status: PrescriptionStatus,
    ) -> AppResult<Prescription> {
        let current = self.get_prescription(prescription_id).await?;
        if current.status != PrescriptionStatus::Active {
            return Err(AppError::InvalidStateTransition(format!(
                "prescription {} is {} and cannot change status",
                prescription_id,
                current.status.as_str()
            )));
        }

        let row = sqlx::query_as::<_, PrescriptionRow>(&format!(
            r#"
            UPDATE prescriptions SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRESCRIPTION_COLUMNS}
            "#
        ))
        .bind(prescription_id)
        .bind(status.as_str())
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    pub async fn delete_prescription(&self, prescription_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
            .bind(prescription_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Prescription".to_string()));
        }

        Ok(())
    }
}
