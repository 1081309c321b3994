use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meet::{Meet, dto::department::CreateDepartmentRequest, models::Department};
use uuid::Uuid;

use crate::error::WebError;

#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "List all departments", body = Vec<Department>)
    ),
    tag = "departments"
)]
pub async fn list_departments(State(meet): State<Meet>) -> Result<Response, WebError> {
    let departments = meet.registration().list_departments().await?;

    Ok(Json(departments).into_response())
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(
        ("id" = Uuid, Path, description = "Department id")
    ),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "departments"
)]
pub async fn get_department(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let department = meet.registration().get_department(id).await?;

    Ok(Json(department).into_response())
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartmentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Validation error or code already used"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "departments"
)]
pub async fn create_department(
    State(meet): State<Meet>,
    Json(req): Json<CreateDepartmentRequest>,
) -> Result<Response, WebError> {
    let department = meet.registration().create_department(req).await?;

    Ok((StatusCode::CREATED, Json(department)).into_response())
}
