//! API route definitions.

mod health;
mod insert;
mod members;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the complete API router.
///
/// - `GET /health` - Liveness probe
/// - `GET /members` - Run discovery, list members and their consumers
/// - `POST /insert_tau_delta` - Enrich and persist a tau/delta point
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/members", get(members::list_members))
        .route("/insert_tau_delta", post(insert::insert_tau_delta))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use taudelta_core::{FieldValue, TAG_CONS, TAG_TOPIC};
    use tower::ServiceExt;

    use crate::testing::{MemoryStore, RecordingNotifier};

    struct TestApp {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        state: AppState,
    }

    fn app(store: MemoryStore) -> TestApp {
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::with_parts(store.clone(), notifier.clone(), 2);
        TestApp {
            store,
            notifier,
            state,
        }
    }

    fn seeded() -> MemoryStore {
        MemoryStore::new()
            .with_tag_values("member_id", &["m1"])
            .with_tag_values("topic", &["consumer/taudelta/m1/c1"])
            .with_status("m1", "c1", "active")
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(app.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get_request(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    fn insert_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/insert_tau_delta")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_always_healthy() {
        let store = MemoryStore::new();
        store.fail_tag_values("member_id");
        let app = app(store);

        let (status, body) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
        assert_eq!(app.store.query_count(), 0);
    }

    #[tokio::test]
    async fn discover_then_insert_end_to_end() {
        let app = app(seeded());

        let (status, body) = send(&app, get_request("/members")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"m1": ["c1"]}));

        let (status, body) = send(
            &app,
            insert_request(r#"{"member_id":"m1","consumer_id":"c1","tau":1.0,"delta":0.5}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Data inserted successfully");
        assert_eq!(body["member_id"], "m1");
        assert_eq!(body["consumer_id"], "c1");
        assert_eq!(body["tau"], 1.0);
        assert_eq!(body["delta"], 0.5);

        let writes = app.store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].tag_value(TAG_TOPIC), Some("consumer/taudelta/m1/c1"));
        assert_eq!(writes[0].tag_value(TAG_CONS), Some("active"));
        assert_eq!(writes[0].field_value("tau"), Some(&FieldValue::Float(1.0)));
        assert_eq!(app.notifier.submitted().len(), 1);
    }

    #[tokio::test]
    async fn member_without_consumers_lists_empty() {
        let app = app(MemoryStore::new().with_tag_values("member_id", &["m2"]));

        let (status, body) = send(&app, get_request("/members")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"m2": []}));
    }

    #[tokio::test]
    async fn insert_before_discovery_uses_empty_tags() {
        let app = app(seeded());

        let (status, _) = send(
            &app,
            insert_request(r#"{"member_id":"m1","consumer_id":"c1","tau":0,"delta":0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let writes = app.store.writes();
        assert_eq!(writes[0].tag_value(TAG_TOPIC), Some(""));
        assert_eq!(writes[0].tag_value(TAG_CONS), Some(""));
    }

    #[tokio::test]
    async fn invalid_bodies_are_rejected_before_the_store() {
        let app = app(seeded());

        for body in [
            r#"{"member_id":"m1","consumer_id":"c1","delta":0.5}"#,
            r#"{"member_id":"m1","consumer_id":"c1","tau":"high","delta":0.5}"#,
            r#"{"member_id":"","consumer_id":"c1","tau":1.0,"delta":0.5}"#,
            r#"not json"#,
        ] {
            let (status, json) = send(&app, insert_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, json!({"error": "Invalid request data"}));
        }

        assert!(app.store.writes().is_empty());
        assert!(app.notifier.submitted().is_empty());
    }

    #[tokio::test]
    async fn ids_that_would_split_the_write_are_rejected() {
        let app = app(seeded());

        for body in [
            r#"{"member_id":"m1\nevil f=1i","consumer_id":"c1","tau":1.0,"delta":0.5}"#,
            r#"{"member_id":"m1","consumer_id":"c1\r\nx y=1","tau":1.0,"delta":0.5}"#,
            r#"{"member_id":"m1","consumer_id":"c1\\","tau":1.0,"delta":0.5}"#,
        ] {
            let (status, json) = send(&app, insert_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, json!({"error": "Invalid request data"}));
        }

        assert!(app.store.writes().is_empty());
        assert!(app.notifier.submitted().is_empty());
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected() {
        let app = app(seeded());
        let request = Request::builder()
            .method("POST")
            .uri("/insert_tau_delta")
            .body(Body::from(
                r#"{"member_id":"m1","consumer_id":"c1","tau":1.0,"delta":0.5}"#,
            ))
            .unwrap();

        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Invalid request data"}));
    }

    #[tokio::test]
    async fn write_failure_is_500_without_notification() {
        let app = app(seeded());
        app.store.fail_writes();

        let (status, json) = send(
            &app,
            insert_request(r#"{"member_id":"m1","consumer_id":"c1","tau":1.0,"delta":0.5}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Failed to insert data"}));
        assert!(app.notifier.submitted().is_empty());
    }

    #[tokio::test]
    async fn discovery_failure_is_500_and_keeps_index() {
        let app = app(seeded());
        let (status, _) = send(&app, get_request("/members")).await;
        assert_eq!(status, StatusCode::OK);
        let before = app.state.index.snapshot();

        app.store.fail_latest();
        let (status, json) = send(&app, get_request("/members")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("injected"));
        assert_eq!(app.state.index.snapshot(), before);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = app(seeded());
        let (status, _) = send(&app, get_request("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
