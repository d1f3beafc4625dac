use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::CoreResult;

/// Guest identity and contact details collected before extras and payment.
#[derive(Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
pub struct PersonalInfo {
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last name is required"))]
    pub last_name: String,
    #[serde(default)]
    pub gender: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, max = 20, message = "phone number must be 6–20 characters"))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "special request is limited to 500 characters"))]
    pub special_request: String,
}

impl PersonalInfo {
    pub fn check(&self) -> CoreResult<()> {
        self.validate()?;
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

// Contact fields stay out of log lines.
impl fmt::Debug for PersonalInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonalInfo")
            .field("title", &self.title)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &"********")
            .field("phone", &"********")
            .field("country", &self.country)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    fn guest() -> PersonalInfo {
        PersonalInfo {
            title: "Ms".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9876543210".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_guest() {
        assert!(guest().check().is_ok());
        assert_eq!(guest().full_name(), "Asha Rao");
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut g = guest();
        g.email = "not-an-email".to_string();
        match g.check() {
            Err(CoreError::ValidationError(msg)) => assert!(msg.contains("email")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut g = guest();
        g.first_name.clear();
        assert!(g.check().is_err());
    }

    #[test]
    fn test_debug_masks_contact_fields() {
        let rendered = format!("{:?}", guest());
        assert!(!rendered.contains("asha@example.com"));
        assert!(!rendered.contains("9876543210"));
    }
}
