use axum::{Router, routing::get};
use meet::Meet;

use super::handlers::{get_leaderboard, get_standings};

pub fn routes() -> Router<Meet> {
    Router::new()
        .route("/", get(get_standings))
        .route("/leaderboard", get(get_leaderboard))
}
