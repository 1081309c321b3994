use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meet::{
    Meet,
    dto::event::{
        AdmitRosterRequest, AdvanceRoundRequest, CloseEventRequest, CloseHeatRequest,
        CreateEventRequest, HeatCommandsRequest, OpenHeatRequest, QualificationResponse,
        RankResponse, RecordQualificationRequest, RecordRankRequest, RoundSnapshot,
        UpdateCurrentRoundRequest,
    },
    models::Event,
};
use uuid::Uuid;

use crate::error::WebError;

#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "List all events with their rounds", body = Vec<Event>)
    ),
    tag = "events"
)]
pub async fn list_events(State(meet): State<Meet>) -> Result<Response, WebError> {
    let events = meet.rounds().list_events().await?;

    Ok(Json(events).into_response())
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 404, description = "Event not found")
    ),
    tag = "events"
)]
pub async fn get_event(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let event = meet.rounds().get_event(id).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/rounds/{round_index}",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("round_index" = usize, Path, description = "Zero-based round index")
    ),
    responses(
        (status = 200, description = "Round rows with eligible and unplaced entries", body = RoundSnapshot),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Round does not exist")
    ),
    tag = "events"
)]
pub async fn get_round(
    State(meet): State<Meet>,
    Path((id, round_index)): Path<(Uuid, usize)>,
) -> Result<Response, WebError> {
    let snapshot = meet.rounds().round_snapshot(id, round_index).await?;

    Ok(Json(snapshot).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Event created with its first round", body = Event),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "events"
)]
pub async fn create_event(
    State(meet): State<Meet>,
    Json(req): Json<CreateEventRequest>,
) -> Result<Response, WebError> {
    let event = meet.rounds().create_event(req).await?;

    Ok((StatusCode::CREATED, Json(event)).into_response())
}

#[utoipa::path(
    put,
    path = "/api/events/{id}/roster",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = AdmitRosterRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Admission roster replaced", body = Event),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Admission is closed"),
        (status = 422, description = "An id is unknown or does not fit the event")
    ),
    tag = "events"
)]
pub async fn admit_roster(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdmitRosterRequest>,
) -> Result<Response, WebError> {
    let event = meet.rounds().admit_roster(id, &req.ids).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/rounds/{round_index}/heats",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("round_index" = usize, Path, description = "Zero-based round index")
    ),
    request_body = OpenHeatRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Entries placed in the heat", body = Event),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Round is not open"),
        (status = 422, description = "An entry is not eligible or already in another heat")
    ),
    tag = "events"
)]
pub async fn open_heat(
    State(meet): State<Meet>,
    Path((id, round_index)): Path<(Uuid, usize)>,
    Json(req): Json<OpenHeatRequest>,
) -> Result<Response, WebError> {
    let event = meet
        .rounds()
        .open_heat(id, round_index, &req.ids, req.heat_number)
        .await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    put,
    path = "/api/events/{id}/rounds/{round_index}/heats/{heat_number}",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("round_index" = usize, Path, description = "Zero-based round index"),
        ("heat_number" = u16, Path, description = "Heat number, starting at 1")
    ),
    request_body = CloseHeatRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Heat rows replaced", body = Event),
        (status = 400, description = "Duplicate entry or rank in the heat"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Round is not open or ranks on a non-final round"),
        (status = 422, description = "An entry is not eligible")
    ),
    tag = "events"
)]
pub async fn close_heat(
    State(meet): State<Meet>,
    Path((id, round_index, heat_number)): Path<(Uuid, usize, u16)>,
    Json(req): Json<CloseHeatRequest>,
) -> Result<Response, WebError> {
    let event = meet
        .rounds()
        .close_heat(id, round_index, heat_number, req.entries)
        .await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/heats/{heat_number}/commands",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("heat_number" = u16, Path, description = "Heat number in the current round")
    ),
    request_body = HeatCommandsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Commands applied and heat committed", body = Event),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Command does not fit the round kind"),
        (status = 422, description = "A command names an entry outside the heat")
    ),
    tag = "events"
)]
pub async fn apply_heat_commands(
    State(meet): State<Meet>,
    Path((id, heat_number)): Path<(Uuid, u16)>,
    Json(req): Json<HeatCommandsRequest>,
) -> Result<Response, WebError> {
    let event = meet
        .rounds()
        .apply_heat_commands(id, heat_number, req.commands)
        .await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/rounds/{round_index}/heats/{heat_number}/qualification",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("round_index" = usize, Path, description = "Zero-based round index"),
        ("heat_number" = u16, Path, description = "Heat number")
    ),
    request_body = RecordQualificationRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Qualified flag toggled", body = QualificationResponse),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Round is final or not open"),
        (status = 422, description = "Entry is not in the heat")
    ),
    tag = "events"
)]
pub async fn record_qualification(
    State(meet): State<Meet>,
    Path((id, round_index, heat_number)): Path<(Uuid, usize, u16)>,
    Json(req): Json<RecordQualificationRequest>,
) -> Result<Response, WebError> {
    let qualified = meet
        .rounds()
        .record_qualification(id, round_index, req.id, heat_number)
        .await?;

    Ok(Json(QualificationResponse {
        id: req.id,
        qualified,
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/rounds/{round_index}/heats/{heat_number}/rank",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("round_index" = usize, Path, description = "Zero-based round index"),
        ("heat_number" = u16, Path, description = "Heat number")
    ),
    request_body = RecordRankRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Rank assigned, or cleared when repeated", body = RankResponse),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Round is not the open final round"),
        (status = 422, description = "Entry is not in the heat")
    ),
    tag = "events"
)]
pub async fn record_rank(
    State(meet): State<Meet>,
    Path((id, round_index, heat_number)): Path<(Uuid, usize, u16)>,
    Json(req): Json<RecordRankRequest>,
) -> Result<Response, WebError> {
    let rank = meet
        .rounds()
        .record_rank(id, round_index, req.id, heat_number, req.rank)
        .await?;

    Ok(Json(RankResponse { id: req.id, rank }).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/rounds",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = AdvanceRoundRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current round completed and the next one appended", body = Event),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Nothing qualified, or the current round is the final")
    ),
    tag = "events"
)]
pub async fn advance_round(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdvanceRoundRequest>,
) -> Result<Response, WebError> {
    let event = meet
        .rounds()
        .advance_round(id, req.name, req.is_final)
        .await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    patch,
    path = "/api/events/{id}/current-round",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = UpdateCurrentRoundRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Round renamed or re-flagged", body = Event),
        (status = 400, description = "Empty name"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Event is completed, or the final already holds ranks")
    ),
    tag = "events"
)]
pub async fn update_current_round(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCurrentRoundRequest>,
) -> Result<Response, WebError> {
    let event = meet.rounds().update_current_round(id, req).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/close",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = CloseEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event completed and winners settled", body = Event),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Event is already completed")
    ),
    tag = "events"
)]
pub async fn close_event(
    State(meet): State<Meet>,
    Path(id): Path<Uuid>,
    Json(req): Json<CloseEventRequest>,
) -> Result<Response, WebError> {
    let event = meet.rounds().close_event(id, req.pending_heat).await?;

    Ok(Json(event).into_response())
}
