use crate::controller::{health_check_controller, log_record_controller};
use crate::{params, sse, AppState};
use axum::{routing::get, Router};
use tower_http::services::ServeDir;

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Log Relay API"
        ),
        paths(
            health_check_controller::health_check,
            log_record_controller::index,
            log_record_controller::create,
            sse::handler::stream_handler,
        ),
        components(
            schemas(
                domain::log_records::Model,
                params::log_record::CreateParams,
                params::log_record::CreatedResponse,
            )
        ),
        tags(
            (name = "log_relay", description = "Real-time log monitoring API")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let static_dir = app_state.config.static_dir.clone();

    Router::new()
        .merge(health_routes())
        .merge(log_record_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .fallback_service(static_routes(&static_dir))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn log_record_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/api/logs",
            get(log_record_controller::index).post(log_record_controller::create),
        )
        .route("/api/logs/stream", get(sse::handler::stream_handler))
        .with_state(app_state)
}

// Anything that isn't an API route is looked up in the static asset directory
pub fn static_routes(static_dir: &str) -> Router {
    Router::new().fallback_service(ServeDir::new(static_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use broadcast::Hub;
    use chrono::{TimeZone, Utc};
    use clap::Parser;
    use domain::log_record::{InMemoryRecordStore, RecordStore};
    use domain::Record;
    use futures::StreamExt;
    use serde_json::{json, Value};
    use service::config::Config;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn record(id: i64, level: &str, category: &str) -> Record {
        Record {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                + chrono::Duration::seconds(id),
            level: level.to_owned(),
            category: category.to_owned(),
            message: format!("record {id}"),
        }
    }

    fn app_state(records: Vec<Record>) -> AppState {
        AppState::new(
            Config::parse_from(["log_relay"]),
            &Arc::new(Hub::default()),
            Arc::new(InMemoryRecordStore::with_records(records)),
            CancellationToken::new(),
        )
    }

    async fn send(app_state: &AppState, request: Request<Body>) -> Response {
        define_routes(app_state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/logs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn wait_for_subscribers(app_state: &AppState, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while app_state.hub.subscriber_count() != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn unmatched_paths_fall_back_to_the_dashboard() {
        let app_state = AppState::new(
            Config::parse_from([
                "log_relay",
                "--static-dir",
                concat!(env!("CARGO_MANIFEST_DIR"), "/static"),
            ]),
            &Arc::new(Hub::default()),
            Arc::new(InMemoryRecordStore::new()),
            CancellationToken::new(),
        );

        let response = send(
            &app_state,
            Request::builder().uri("/").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(std::str::from_utf8(&page).unwrap().contains("/app.js"));

        let response = send(
            &app_state,
            Request::builder().uri("/app.js").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app_state,
            Request::builder().uri("/missing.txt").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_check_responds_healthy() {
        let app_state = app_state(Vec::new());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = send(&app_state, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"healthy");
    }

    #[tokio::test]
    async fn index_returns_matching_records_newest_first() {
        let app_state = app_state(vec![
            record(1, "ERROR", "DATABASE"),
            record(2, "INFO", "SYSTEM"),
            record(3, "ERROR", "API"),
            record(4, "ERROR", "DATABASE"),
        ]);
        let request = Request::builder()
            .uri("/api/logs?level=ERROR&type=DATABASE")
            .body(Body::empty())
            .unwrap();

        let response = send(&app_state, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![4, 1]);
        assert_eq!(body[0]["type"], "DATABASE");
        assert_eq!(body[0]["level"], "ERROR");
    }

    #[tokio::test]
    async fn index_is_capped_at_the_snapshot_limit() {
        let app_state = app_state((1..=150).map(|id| record(id, "INFO", "SYSTEM")).collect());
        let request = Request::builder().uri("/api/logs").body(Body::empty()).unwrap();

        let body = json_body(send(&app_state, request).await).await;

        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 100);
        assert_eq!(records[0]["id"], 150);
        assert_eq!(records[99]["id"], 51);
    }

    #[tokio::test]
    async fn create_returns_the_new_id() {
        let app_state = app_state(vec![record(41, "INFO", "SYSTEM")]);

        let response = send(
            &app_state,
            post_json(r#"{"level":"WARNING","type":"AUTH","message":"Failed login"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await, json!({"id": 42}));

        let snapshot = app_state
            .record_store
            .fetch(&domain::Filter::new(Some("WARNING".to_owned()), None), 10)
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].category, "AUTH");
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let app_state = app_state(Vec::new());

        let response = send(
            &app_state,
            post_json(r#"{"level":"INFO","type":"  ","message":"m"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"type must not be empty");
    }

    #[tokio::test]
    async fn create_rejects_malformed_json() {
        let app_state = app_state(Vec::new());

        let response = send(&app_state, post_json(r#"{"level":"#)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let app_state = app_state(Vec::new());

        let response = send(&app_state, post_json(r#"{"level":"INFO"}"#)).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn stream_delivers_only_matching_records_as_data_frames() {
        let app_state = app_state(Vec::new());
        let request = Request::builder()
            .uri("/api/logs/stream?level=ERROR")
            .body(Body::empty())
            .unwrap();

        let response = send(&app_state, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(app_state.hub.subscriber_count(), 1);

        app_state.hub.dispatch(&record(1, "INFO", "SYSTEM"));
        app_state.hub.dispatch(&record(2, "ERROR", "DATABASE"));

        let mut body = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let frame = std::str::from_utf8(&frame).unwrap();

        let payload = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap();
        let delivered: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(delivered["id"], 2);
        assert_eq!(delivered["type"], "DATABASE");
    }

    #[tokio::test]
    async fn dropping_the_stream_unregisters_the_subscriber() {
        let app_state = app_state(Vec::new());
        let request = Request::builder()
            .uri("/api/logs/stream")
            .body(Body::empty())
            .unwrap();

        let response = send(&app_state, request).await;
        assert_eq!(app_state.hub.subscriber_count(), 1);

        drop(response);

        wait_for_subscribers(&app_state, 0).await;
    }

    #[tokio::test]
    async fn shutdown_ends_open_streams() {
        let app_state = app_state(Vec::new());
        let request = Request::builder()
            .uri("/api/logs/stream")
            .body(Body::empty())
            .unwrap();

        let response = send(&app_state, request).await;
        let mut body = response.into_body().into_data_stream();

        app_state.shutdown.cancel();

        let end = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap();
        assert!(end.is_none());
        wait_for_subscribers(&app_state, 0).await;
    }
}
