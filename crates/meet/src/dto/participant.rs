use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Gender;

/// Request payload for registering a competitor. The chest number is issued by
/// the allocator and never accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateParticipantRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[validate(length(
        min = 1,
        max = 64,
        message = "Registration code must be between 1 and 64 characters"
    ))]
    #[validate(custom(function = "validate_registration_code"))]
    pub registration_code: String,

    pub department_id: Uuid,

    #[validate(length(max = 255))]
    pub cohort: Option<String>,

    #[validate(range(min = 1, max = 12, message = "Semester must be between 1 and 12"))]
    pub semester: Option<i16>,

    pub gender: Gender,
}

/// Biographical fields staff may correct after registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateParticipantRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    pub department_id: Option<Uuid>,

    #[validate(length(max = 255))]
    pub cohort: Option<String>,

    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i16>,

    pub gender: Option<Gender>,
}

fn validate_registration_code(code: &str) -> Result<(), validator::ValidationError> {
    if code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/') {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_registration_code"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(code: &str) -> CreateParticipantRequest {
        CreateParticipantRequest {
            name: "Asha Rao".to_string(),
            registration_code: code.to_string(),
            department_id: Uuid::new_v4(),
            cohort: Some("2024".to_string()),
            semester: Some(3),
            gender: Gender::Female,
        }
    }

    #[test]
    fn test_registration_code_rules() {
        assert!(request("21/CS-104").validate().is_ok());
        assert!(request("").validate().is_err());
        assert!(request("has space").validate().is_err());
    }

    #[test]
    fn test_semester_range() {
        let mut req = request("A1");
        req.semester = Some(13);
        assert!(req.validate().is_err());
    }
}
