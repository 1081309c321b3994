pub mod departments;
pub mod events;
pub mod participants;
pub mod standings;
pub mod teams;

use axum::Router;
use meet::Meet;

use crate::middleware::auth::ApiKeys;

pub fn router(meet: Meet, api_keys: ApiKeys) -> Router {
    Router::new()
        .nest("/api/departments", departments::routes::routes(api_keys.clone()))
        .nest("/api/participants", participants::routes::routes(api_keys.clone()))
        .nest("/api/teams", teams::routes::routes(api_keys.clone()))
        .nest("/api/events", events::routes::routes(api_keys))
        .nest("/api/standings", standings::routes::routes())
        .with_state(meet)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use meet::{EngineConfig, InMemoryStore};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const KEY: &str = "test-key";

    fn app() -> Router {
        let meet = Meet::new(InMemoryStore::new(), EngineConfig::default());
        router(meet, ApiKeys::from_comma_separated(KEY))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", KEY));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_write_routes_require_api_key() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/departments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"name": "Physics", "code": "PHY"}).to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_registration_reports_existing_record() {
        let app = app();
        let (status, department) = send(
            &app,
            "POST",
            "/api/departments",
            Some(json!({"name": "Physics", "code": "PHY"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let registration = json!({
            "name": "Kiran Das",
            "registration_code": "22PH017",
            "department_id": department["department_id"],
            "cohort": null,
            "semester": 3,
            "gender": "M"
        });
        let (status, first) = send(&app, "POST", "/api/participants", Some(registration.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["chest_number"], 101);

        let (status, body) = send(&app, "POST", "/api/participants", Some(registration)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["participant_id"], first["participant_id"]);
        assert_eq!(body["chest_number"], 101);
    }

    #[tokio::test]
    async fn test_rank_on_first_round_is_conflict() {
        let app = app();
        let (_, department) = send(
            &app,
            "POST",
            "/api/departments",
            Some(json!({"name": "Maths", "code": "MATH"})),
        )
        .await;
        let (_, runner) = send(
            &app,
            "POST",
            "/api/participants",
            Some(json!({
                "name": "Leela Nair",
                "registration_code": "22MA001",
                "department_id": department["department_id"],
                "cohort": null,
                "semester": null,
                "gender": "F"
            })),
        )
        .await;
        let (status, event) = send(
            &app,
            "POST",
            "/api/events",
            Some(json!({
                "name": "High jump",
                "discipline": "individual",
                "gender_category": "F",
                "team_size": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let event_id = event["event_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/events/{}/roster", event_id),
            Some(json!({"ids": [runner["participant_id"]]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/events/{}/rounds/0/heats", event_id),
            Some(json!({"heat_number": 1, "ids": [runner["participant_id"]]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/events/{}/rounds/0/heats/1/rank", event_id),
            Some(json!({"id": runner["participant_id"], "rank": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, snapshot) = send(&app, "GET", &format!("/api/events/{}/rounds/0", event_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["round"]["participants"][0]["rank"], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_event_is_rejected_by_the_core() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/events",
            Some(json!({
                "name": "",
                "discipline": "group",
                "gender_category": "M",
                "team_size": 4
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Validation error"));

        let (status, events) = send(&app, "GET", "/api/events", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events, json!([]));
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let app = app();
        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/events/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
