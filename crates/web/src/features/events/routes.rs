use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};
use meet::Meet;

use super::handlers::{
    admit_roster, advance_round, apply_heat_commands, close_event, close_heat, create_event,
    get_event, get_round, list_events, open_heat, record_qualification, record_rank,
    update_current_round,
};
use crate::middleware::auth::{ApiKeys, require_auth};

pub fn routes(api_keys: ApiKeys) -> Router<Meet> {
    let protected = Router::new()
        .route("/", post(create_event))
        .route("/:id/roster", put(admit_roster))
        .route("/:id/rounds", post(advance_round))
        .route("/:id/current-round", patch(update_current_round))
        .route("/:id/rounds/:round_index/heats", post(open_heat))
        .route("/:id/rounds/:round_index/heats/:heat_number", put(close_heat))
        .route(
            "/:id/rounds/:round_index/heats/:heat_number/qualification",
            post(record_qualification),
        )
        .route(
            "/:id/rounds/:round_index/heats/:heat_number/rank",
            post(record_rank),
        )
        .route("/:id/heats/:heat_number/commands", post(apply_heat_commands))
        .route("/:id/close", post(close_event))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(list_events))
        .route("/:id", get(get_event))
        .route("/:id/rounds/:round_index", get(get_round))
        .merge(protected)
}
