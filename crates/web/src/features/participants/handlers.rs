use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meet::{
    Meet,
    dto::{
        participant::{CreateParticipantRequest, UpdateParticipantRequest},
        standings::{Achievement, ParticipantStats},
    },
    models::Participant,
};
use uuid::Uuid;

use crate::error::WebError;

#[utoipa::path(
    get,
    path = "/api/participants",
    responses(
        (status = 200, description = "All participants ordered by chest number", body = Vec<Participant>)
    ),
    tag = "participants"
)]
pub async fn list_participants(State(meet): State<Meet>) -> Result<Response, WebError> {
    let participants = meet.registration().list_participants().await?;

    Ok(Json(participants).into_response())
}

#[utoipa::path(
    get,
    path = "/api/participants/{id}",
    params(
        ("id" = Uuid, Path, description = "Participant id")
    ),
    responses(
        (status = 200, description = "Participant found", body = Participant),
        (status = 404, description = "Participant not found")
    ),
    tag = "participants"
)]
pub async fn get_participant(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let participant = meet.registration().get_participant(id).await?;

    Ok(Json(participant).into_response())
}

#[utoipa::path(
    get,
    path = "/api/participants/{id}/stats",
    params(
        ("id" = Uuid, Path, description = "Participant id")
    ),
    responses(
        (status = 200, description = "Recomputed points and medals", body = ParticipantStats),
        (status = 404, description = "Participant not found")
    ),
    tag = "participants"
)]
pub async fn get_participant_stats(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let stats = meet.scoring().participant_stats(id).await?;

    Ok(Json(stats).into_response())
}

#[utoipa::path(
    get,
    path = "/api/participants/{id}/achievements",
    params(
        ("id" = Uuid, Path, description = "Participant id")
    ),
    responses(
        (status = 200, description = "Every placement credited to the participant", body = Vec<Achievement>),
        (status = 404, description = "Participant not found")
    ),
    tag = "participants"
)]
pub async fn get_participant_achievements(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let achievements = meet.scoring().achievements(id).await?;

    Ok(Json(achievements).into_response())
}

#[utoipa::path(
    post,
    path = "/api/participants",
    request_body = CreateParticipantRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Participant registered with a new chest number", body = Participant),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Registration code already used"),
        (status = 503, description = "Chest number allocation contended, retry")
    ),
    tag = "participants"
)]
pub async fn register_participant(
    State(meet): State<Meet>,
    Json(req): Json<CreateParticipantRequest>,
) -> Result<Response, WebError> {
    let participant = meet.registration().register_participant(req).await?;

    Ok((StatusCode::CREATED, Json(participant)).into_response())
}

#[utoipa::path(
    put,
    path = "/api/participants/{id}",
    params(
        ("id" = Uuid, Path, description = "Participant id")
    ),
    request_body = UpdateParticipantRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Participant updated", body = Participant),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Participant not found")
    ),
    tag = "participants"
)]
pub async fn update_participant(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateParticipantRequest>,
) -> Result<Response, WebError> {
    let participant = meet.registration().update_participant(id, req).await?;

    Ok(Json(participant).into_response())
}
