//! Prescription record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::expiry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PrescriptionStatus::Active),
            "completed" => Some(PrescriptionStatus::Completed),
            "cancelled" => Some(PrescriptionStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub medication_name: String,
    pub dosage_instructions: Option<String>,
    pub quantity: i32,
    pub issued_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        expiry::is_expired(today, self.expiry_date)
    }

    pub fn is_near_expiry(&self, today: NaiveDate, threshold_days: i64) -> bool {
        expiry::is_near_expiry(today, self.expiry_date, threshold_days)
    }

    /// Active and not past its expiry date
    pub fn is_valid(&self, today: NaiveDate) -> bool {
        self.status == PrescriptionStatus::Active && !self.is_expired(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prescription(status: PrescriptionStatus, expiry_date: Option<NaiveDate>) -> Prescription {
        let now = Utc::now();
        Prescription {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            medication_name: "Amoxicillin".to_string(),
            dosage_instructions: None,
            quantity: 30,
            issued_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            expiry_date,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn validity_requires_active_status_and_unexpired_date() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        let active = prescription(PrescriptionStatus::Active, Some(today));
        // Valid through the expiry day itself
        assert!(active.is_valid(today));

        let expired = prescription(
            PrescriptionStatus::Active,
            Some(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()),
        );
        assert!(!expired.is_valid(today));

        let cancelled = prescription(PrescriptionStatus::Cancelled, None);
        assert!(!cancelled.is_valid(today));
    }

    #[test]
    fn near_expiry_excludes_the_expiry_day() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let ends_in_five = prescription(
            PrescriptionStatus::Active,
            Some(NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()),
        );
        assert!(ends_in_five.is_near_expiry(today, 7));
        assert!(!ends_in_five.is_near_expiry(today, 3));

        let ends_today = prescription(PrescriptionStatus::Active, Some(today));
        assert!(!ends_today.is_near_expiry(today, 7));
    }
}
