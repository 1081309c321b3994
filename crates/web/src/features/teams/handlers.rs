use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meet::{
    Meet,
    dto::team::{CreateTeamRequest, TeamDetail, TeamListQuery},
    models::Team,
};
use uuid::Uuid;

use crate::error::WebError;

#[utoipa::path(
    get,
    path = "/api/teams",
    params(TeamListQuery),
    responses(
        (status = 200, description = "Teams, optionally for one event", body = Vec<Team>)
    ),
    tag = "teams"
)]
pub async fn list_teams(
    State(meet): State<Meet>,
    Query(query): Query<TeamListQuery>,
) -> Result<Response, WebError> {
    let teams = meet.teams().list_teams(query.event_id).await?;

    Ok(Json(teams).into_response())
}

#[utoipa::path(
    get,
    path = "/api/teams/{id}",
    params(
        ("id" = Uuid, Path, description = "Team id")
    ),
    responses(
        (status = 200, description = "Team with its members in slot order", body = TeamDetail),
        (status = 404, description = "Team not found")
    ),
    tag = "teams"
)]
pub async fn get_team(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let team = meet.teams().get_team(id).await?;

    Ok(Json(team).into_response())
}

#[utoipa::path(
    post,
    path = "/api/teams",
    request_body = CreateTeamRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Team registered", body = TeamDetail),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "A member does not exist or does not fit the event")
    ),
    tag = "teams"
)]
pub async fn register_team(
    State(meet): State<Meet>,
    Json(req): Json<CreateTeamRequest>,
) -> Result<Response, WebError> {
    let team = meet.teams().register_team(req).await?;

    Ok((StatusCode::CREATED, Json(team)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/teams/{id}",
    params(
        ("id" = Uuid, Path, description = "Team id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Team deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Team not found"),
        (status = 409, description = "Team is already on its event's roster")
    ),
    tag = "teams"
)]
pub async fn delete_team(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    meet.teams().delete_team(id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
