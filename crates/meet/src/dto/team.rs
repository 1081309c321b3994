use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Participant, Team};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTeamRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    pub department_id: Uuid,

    pub event_id: Uuid,

    /// Member participant ids in slot order.
    #[validate(length(min = 1, message = "A team needs at least one member"))]
    pub members: Vec<Uuid>,
}

/// A team together with its members, in slot order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamDetail {
    pub team: Team,
    pub members: Vec<Participant>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TeamListQuery {
    /// Only teams registered for this event.
    pub event_id: Option<Uuid>,
}
