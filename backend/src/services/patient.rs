//! Patient registry service

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::Patient;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PatientService {
    db: PgPool,
}

/// Input for registering a patient
#[derive(Debug, Deserialize)]
pub struct CreatePatientInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub notifications_enabled: Option<bool>,
}

/// Input for updating a patient
#[derive(Debug, Deserialize)]
pub struct UpdatePatientInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Debug, FromRow)]
struct PatientRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    notifications_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            notifications_enabled: row.notifications_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PATIENT_COLUMNS: &str = "id, first_name, last_name, email, phone, date_of_birth, \
     notifications_enabled, created_at, updated_at";

impl PatientService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_patient(&self, input: CreatePatientInput) -> AppResult<Patient> {
        if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "First and last name must not be empty".to_string(),
            });
        }

        let row = sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            INSERT INTO patients (first_name, last_name, email, phone, date_of_birth, notifications_enabled)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PATIENT_COLUMNS}
            "#
        ))
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.date_of_birth)
        .bind(input.notifications_enabled.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> AppResult<Patient> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1"
        ))
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient".to_string()))?;

        Ok(row.into())
    }

    pub async fn list_patients(&self) -> AppResult<Vec<Patient>> {
        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY last_name ASC, first_name ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Patient::from).collect())
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        input: UpdatePatientInput,
    ) -> AppResult<Patient> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            UPDATE patients SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                date_of_birth = COALESCE($6, date_of_birth),
                notifications_enabled = COALESCE($7, notifications_enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PATIENT_COLUMNS}
            "#
        ))
        .bind(patient_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.date_of_birth)
        .bind(input.notifications_enabled)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient".to_string()))?;

        Ok(row.into())
    }

    pub async fn delete_patient(&self, patient_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(patient_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Patient".to_string()));
        }

        Ok(())
    }
}
