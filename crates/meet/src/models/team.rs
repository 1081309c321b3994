use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A fixed roster entered into one group event. Membership never changes after
/// creation; edits are a delete followed by a new registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Team {
    pub team_id: Uuid,
    pub name: String,
    pub department_id: Uuid,
    pub event_id: Uuid,
    /// Ordered member slots.
    pub members: Vec<Uuid>,
    pub created_at: chrono::NaiveDateTime,
}
