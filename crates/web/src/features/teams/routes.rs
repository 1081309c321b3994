use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use meet::Meet;

use super::handlers::{delete_team, get_team, list_teams, register_team};
use crate::middleware::auth::{ApiKeys, require_auth};

pub fn routes(api_keys: ApiKeys) -> Router<Meet> {
    let protected = Router::new()
        .route("/", post(register_team))
        .route("/:id", delete(delete_team))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(list_teams))
        .route("/:id", get(get_team))
        .merge(protected)
}
