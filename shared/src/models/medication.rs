//! Medication record
//!
//! A medication here is a dispensed item tied to a patient, with its own
//! expiry date independent of warehouse stock batches. The status lifecycle
//! (ACTIVE / DISCONTINUED / ON_HOLD / COMPLETED) gates the expiry scan:
//! only active medications generate warnings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::expiry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationStatus {
    Active,
    Discontinued,
    OnHold,
    Completed,
}

impl MedicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicationStatus::Active => "active",
            MedicationStatus::Discontinued => "discontinued",
            MedicationStatus::OnHold => "on_hold",
            MedicationStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MedicationStatus::Active),
            "discontinued" => Some(MedicationStatus::Discontinued),
            "on_hold" => Some(MedicationStatus::OnHold),
            "completed" => Some(MedicationStatus::Completed),
            _ => None,
        }
    }

    /// DISCONTINUED and COMPLETED are end states; ON_HOLD can go back to
    /// ACTIVE.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MedicationStatus::Discontinued | MedicationStatus::Completed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub status: MedicationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medication {
    pub fn is_active(&self) -> bool {
        self.status == MedicationStatus::Active
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        expiry::is_expired(today, self.expiry_date)
    }

    pub fn is_near_expiry(&self, today: NaiveDate, threshold_days: i64) -> bool {
        expiry::is_near_expiry(today, self.expiry_date, threshold_days)
    }

    /// Whether the daily expiry scan should warn about this medication: it
    /// must still be active and inside the look-ahead window. Discontinued,
    /// on-hold and completed medications never warn.
    pub fn needs_expiry_warning(&self, today: NaiveDate, threshold_days: i64) -> bool {
        self.is_active() && self.is_near_expiry(today, threshold_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medication(status: MedicationStatus, expiry_date: Option<NaiveDate>) -> Medication {
        let now = Utc::now();
        Medication {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            name: "Metformin".to_string(),
            dosage: None,
            manufacturer: None,
            batch_number: None,
            expiry_date,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn expiry_warnings_require_active_status() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let expiring = Some(NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());

        assert!(medication(MedicationStatus::Active, expiring).needs_expiry_warning(today, 7));
        // Same window, inactive statuses never warn
        assert!(
            !medication(MedicationStatus::Discontinued, expiring).needs_expiry_warning(today, 7)
        );
        assert!(!medication(MedicationStatus::OnHold, expiring).needs_expiry_warning(today, 7));
        assert!(!medication(MedicationStatus::Completed, expiring).needs_expiry_warning(today, 7));

        // Active but outside the window
        assert!(!medication(MedicationStatus::Active, expiring).needs_expiry_warning(today, 3));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            MedicationStatus::Active,
            MedicationStatus::Discontinued,
            MedicationStatus::OnHold,
            MedicationStatus::Completed,
        ] {
            assert_eq!(MedicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MedicationStatus::parse("expired"), None);
    }

    #[test]
    fn only_end_states_are_terminal() {
        assert!(!MedicationStatus::Active.is_terminal());
        assert!(!MedicationStatus::OnHold.is_terminal());
        assert!(MedicationStatus::Discontinued.is_terminal());
        assert!(MedicationStatus::Completed.is_terminal());
    }
}
