use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Department {
    pub department_id: Uuid,
    pub name: String,
    pub code: String,
}
