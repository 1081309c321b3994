use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meet::{MeetError, StorageError};
use serde_json::json;
use std::fmt;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Meet(MeetError),
    Unauthorized,
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meet(e) => write!(f, "{}", e),
            Self::Unauthorized => write!(f, "Unauthorized"),
        }
    }
}

impl WebError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Meet(MeetError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Meet(MeetError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Meet(MeetError::DuplicateRegistration { .. }) => StatusCode::CONFLICT,
            Self::Meet(MeetError::InvalidState(_)) => StatusCode::CONFLICT,
            Self::Meet(MeetError::Persistence(StorageError::Conflict(_))) => StatusCode::CONFLICT,
            Self::Meet(MeetError::InvalidParticipant { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Meet(MeetError::ResourceContention { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Meet(MeetError::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let body = match &self {
            Self::Meet(MeetError::DuplicateRegistration {
                registration_code,
                participant_id,
                chest_number,
            }) => {
                json!({
                    "error": self.to_string(),
                    "registration_code": registration_code,
                    "participant_id": participant_id,
                    "chest_number": chest_number,
                })
            }
            Self::Meet(MeetError::InvalidParticipant { id, reason }) => {
                json!({
                    "error": self.to_string(),
                    "id": id,
                    "reason": reason,
                })
            }
            Self::Meet(MeetError::Persistence(StorageError::Conflict(_))) => {
                json!({
                    "error": "The record was changed by another request; reload and retry"
                })
            }
            Self::Meet(MeetError::Persistence(e)) => {
                tracing::error!("Persistence error: {:?}", e);
                json!({
                    "error": "An internal error occurred"
                })
            }
            Self::Meet(e) => {
                json!({
                    "error": e.to_string()
                })
            }
            Self::Unauthorized => {
                json!({
                    "error": "Unauthorized"
                })
            }
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<MeetError> for WebError {
    fn from(error: MeetError) -> Self {
        Self::Meet(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MeetError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (MeetError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (MeetError::InvalidState("x".into()), StatusCode::CONFLICT),
            (
                MeetError::InvalidParticipant {
                    id: Uuid::new_v4(),
                    reason: "x".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                MeetError::ResourceContention { attempts: 3 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                MeetError::Persistence(StorageError::Conflict("x".into())),
                StatusCode::CONFLICT,
            ),
            (
                MeetError::Persistence(StorageError::Timeout(std::time::Duration::from_secs(1))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(WebError::from(error).status_code(), expected);
        }
    }
}
