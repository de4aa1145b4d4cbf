//! Patient record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Email delivery requires both an address on file and opt-in.
    pub fn can_receive_email(&self) -> bool {
        self.notifications_enabled && self.email.as_deref().map_or(false, |e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(email: Option<&str>, enabled: bool) -> Patient {
        let now = Utc::now();
        Patient {
            id: Uuid::new_v4(),
            first_name: "Alex".to_string(),
            last_name: "Morgan".to_string(),
            email: email.map(String::from),
            phone: None,
            date_of_birth: None,
            notifications_enabled: enabled,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_requires_address_and_opt_in() {
        assert!(patient(Some("alex@example.com"), true).can_receive_email());
        assert!(!patient(Some("alex@example.com"), false).can_receive_email());
        assert!(!patient(None, true).can_receive_email());
        assert!(!patient(Some(""), true).can_receive_email());
    }
}
