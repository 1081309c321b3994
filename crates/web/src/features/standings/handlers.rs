use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use meet::{
    Meet,
    dto::standings::{LeaderboardResponse, Standings},
};

use crate::error::WebError;

#[utoipa::path(
    get,
    path = "/api/standings",
    responses(
        (status = 200, description = "Points and medals of every participant and department", body = Standings)
    ),
    tag = "standings"
)]
pub async fn get_standings(State(meet): State<Meet>) -> Result<Response, WebError> {
    let standings = meet.scoring().standings().await?;

    Ok(Json(standings).into_response())
}

#[utoipa::path(
    get,
    path = "/api/standings/leaderboard",
    responses(
        (status = 200, description = "Department leaderboard and per-gender participant leaderboards", body = LeaderboardResponse)
    ),
    tag = "standings"
)]
pub async fn get_leaderboard(State(meet): State<Meet>) -> Result<Response, WebError> {
    let leaderboard = meet.scoring().leaderboard().await?;

    Ok(Json(leaderboard).into_response())
}
