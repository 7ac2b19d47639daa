use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use adlens_core::config::Config;
use adlens_server::app::build_app;
use adlens_server::state::AppState;

const META_CSV: &str = r#"Day,Ad ID,Ad name,Ad set ID,Ad set name,Campaign ID,Campaign name,Amount spent (USD),Link clicks,Impressions
2024-01-01,a1,Promo,s1,US,c1,Spring,10.00,4,100
2024-01-01,a1,Promo,s1,US,c1,Spring,5.00,1,50
2024-01-02,a2,Launch,s2,CA,c1,Spring,"$1,200.00",7,900
"#;

fn setup_with(config: Config) -> axum::Router {
    build_app(Arc::new(AppState::in_memory(config)))
}

fn setup() -> axum::Router {
    setup_with(Config::default())
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

fn upload(source: &str, filename: &str, text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/reports?source={source}&filename={filename}"))
        .header("content-type", "text/csv")
        .body(Body::from(text.to_string()))
        .expect("build request")
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

#[tokio::test]
async fn test_upload_dedups_rows_and_lists_summary() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(upload("meta", "meta.csv", META_CSV))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["data"]["source"], "meta");
    assert_eq!(json["data"]["side"], "buyside");
    assert_eq!(json["data"]["row_count"], 2);
    assert_eq!(json["ingest"]["rows_read"], 3);
    assert_eq!(json["ingest"]["rows_merged"], 1);
    let id = json["data"]["id"].as_str().expect("id").to_string();
    assert_eq!(id.len(), 64);

    let response = app
        .oneshot(request("GET", "/api/reports"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let reports = json["data"].as_array().expect("array");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["id"], id.as_str());
    assert_eq!(reports[0]["filename"], "meta.csv");
}

#[tokio::test]
async fn test_same_content_under_new_name_is_rejected() {
    let app = setup();
    let first = app
        .clone()
        .oneshot(upload("meta", "monday.csv", META_CSV))
        .await
        .expect("request");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(upload("meta", "tuesday.csv", META_CSV))
        .await
        .expect("request");
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = json_body(second).await;
    assert_eq!(json["error"]["code"], "duplicate_report");
    assert!(json["error"]["message"]
        .as_str()
        .expect("message")
        .contains("monday.csv"));
}

#[tokio::test]
async fn test_missing_headers_are_named() {
    let app = setup();
    let response = app
        .oneshot(upload("system1", "s1.csv", "Date,Sub ID,Ad Clicks\n2024-01-01,a1,3\n"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "missing_headers");
    assert_eq!(json["error"]["field"], "Estimated Revenue, Page Views");
}

#[tokio::test]
async fn test_unknown_source_is_a_validation_error() {
    let app = setup();
    let response = app
        .oneshot(upload("snapchat", "x.csv", META_CSV))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(json["error"]["field"], "source");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let app = setup_with(Config {
        max_upload_bytes: 64,
        ..Config::default()
    });
    let response = app
        .oneshot(upload("meta", "big.csv", META_CSV))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "payload_too_large");
}

#[tokio::test]
async fn test_delete_unloads_report() {
    let app = setup();
    let response = app
        .clone()
        .oneshot(upload("meta", "meta.csv", META_CSV))
        .await
        .expect("request");
    let id = json_body(response).await["data"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    let uri = format!("/api/reports/{id}");
    let response = app
        .clone()
        .oneshot(request("DELETE", &uri))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(request("DELETE", &uri))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request("GET", "/api/reports"))
        .await
        .expect("request");
    let json = json_body(response).await;
    assert!(json["data"].as_array().expect("array").is_empty());
}
