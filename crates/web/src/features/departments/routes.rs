use axum::{
    Router, middleware,
    routing::{get, post},
};
use meet::Meet;

use super::handlers::{create_department, get_department, list_departments};
use crate::middleware::auth::{ApiKeys, require_auth};

pub fn routes(api_keys: ApiKeys) -> Router<Meet> {
    let protected = Router::new()
        .route("/", post(create_department))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(list_departments))
        .route("/:id", get(get_department))
        .merge(protected)
}
