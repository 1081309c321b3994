use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use meet::Meet;

use super::handlers::{
    get_participant, get_participant_achievements, get_participant_stats, list_participants,
    register_participant, update_participant,
};
use crate::middleware::auth::{ApiKeys, require_auth};

pub fn routes(api_keys: ApiKeys) -> Router<Meet> {
    let protected = Router::new()
        .route("/", post(register_participant))
        .route("/:id", put(update_participant))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(list_participants))
        .route("/:id", get(get_participant))
        .route("/:id/stats", get(get_participant_stats))
        .route("/:id/achievements", get(get_participant_achievements))
        .merge(protected)
}
