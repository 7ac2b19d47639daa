use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use adlens_core::config::Config;
use adlens_server::app::build_app;
use adlens_server::state::AppState;

const META_CSV: &str = "Day,Ad ID,Ad name,Ad set ID,Ad set name,Campaign ID,Campaign name,Amount spent (USD),Link clicks,Impressions
2024-01-01,a1,Summer promo,s1,US broad,c1,Spring Sale,100,10,1000
2024-01-01,a2,Evergreen,s1,US broad,c1,Spring Sale,50,5,500
2024-01-02,a3,Launch teaser,s2,UK,c2,=Launch,80,8,800
";

const TONIC_CSV: &str = "date,subid,revenue,clicks,views
2024-01-01,a1,150,20,300
2024-01-01,a2,20,4,40
2024-01-02,a3,40,10,100
2024-01-02,ghost,999,9,9
";

fn window() -> Value {
    json!({ "from": "2024-01-01", "to": "2024-01-02" })
}

async fn setup_with(config: Config) -> axum::Router {
    let app = build_app(Arc::new(AppState::in_memory(config)));
    for (source, text) in [("meta", META_CSV), ("tonic", TONIC_CSV)] {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/reports?source={source}&filename={source}.csv"))
            .body(Body::from(text))
            .expect("build request");
        let response = app.clone().oneshot(request).await.expect("request");
        assert_eq!(response.status(), StatusCode::CREATED, "upload {source}");
    }
    app
}

async fn setup() -> axum::Router {
    setup_with(Config::default()).await
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
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

async fn text_body(response: axum::http::Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

#[tokio::test]
async fn test_campaign_rollup_joins_sellside_and_formats_totals() {
    let app = setup().await;
    let response = app
        .oneshot(post_json(
            "/api/analysis",
            json!({ "level": "campaign", "window": window() }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let data = json_body(response).await["data"].clone();
    assert_eq!(data["total_records"], 2);
    assert_eq!(data["total_pages"], 1);
    assert_eq!(data["page_number"], 1);

    let page = data["page"].as_array().expect("page");
    assert_eq!(page[0]["id"], "c1");
    assert_eq!(page[0]["name"], "Spring Sale");
    assert_eq!(page[0]["spend"], 150.0);
    assert_eq!(page[0]["revenue"], 170.0);
    assert_eq!(page[0]["ad_clicks"], 24);
    assert_eq!(page[0]["children"], json!(["s1"]));
    assert_eq!(page[1]["id"], "c2");

    // Sell-side rows for ads with no buy-side row are not counted.
    assert_eq!(data["totals"]["revenue"], 210.0);
    assert_eq!(data["formatted_totals"]["spend"], "$230.00");
    assert_eq!(data["formatted_totals"]["margin"], "-$20.00");
    assert_eq!(data["formatted_totals"]["roi"], "-8.70%");
    assert_eq!(data["formatted_totals"]["cpac"], "$6.76");
    assert_eq!(data["formatted_page"][1]["roi"], "-50.00%");
}

#[tokio::test]
async fn test_ad_filters_combine_with_and() {
    let app = setup().await;
    let body = json!({
        "level": "ad",
        "window": window(),
        "filters": [
            { "level": "ad", "column": "spend", "operator": "greater_than", "value": 60 },
            { "level": "ad", "column": "name", "operator": "contains", "value": "PROMO" }
        ]
    });
    let response = app
        .oneshot(post_json("/api/analysis", body))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["total_records"], 1);
    assert_eq!(data["page"][0]["id"], "a1");
}

#[tokio::test]
async fn test_mismatched_filter_passes_unless_strict() {
    let body = json!({
        "level": "ad",
        "window": window(),
        "filters": [
            { "level": "ad", "column": "spend", "operator": "contains", "value": "5" }
        ]
    });

    let lenient = setup().await;
    let response = lenient
        .oneshot(post_json("/api/analysis", body.clone()))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["total_records"], 3);

    let strict = setup_with(Config {
        strict_filters: true,
        ..Config::default()
    })
    .await;
    let response = strict
        .oneshot(post_json("/api/analysis", body))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(json["error"]["field"], "filters");
}

#[tokio::test]
async fn test_preset_replaces_window() {
    let app = setup().await;
    let response = app
        .oneshot(post_json(
            "/api/analysis",
            json!({ "level": "campaign", "window": window(), "preset": "today" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["total_records"], 0);
    assert_eq!(data["total_pages"], 0);
    assert_eq!(data["formatted_totals"]["roi"], "0.00%");
    assert_eq!(data["window"]["from"], data["window"]["to"]);
}

#[tokio::test]
async fn test_missing_window_yields_empty_result() {
    let app = setup().await;
    let response = app
        .oneshot(post_json("/api/analysis", json!({ "level": "adset" })))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["total_records"], 0);
    assert_eq!(data["totals"]["spend"], 0.0);
}

#[tokio::test]
async fn test_export_csv_is_unpaginated_and_sanitized() {
    let app = setup().await;
    let response = app
        .oneshot(post_json(
            "/api/analysis/export?format=csv",
            json!({ "level": "campaign", "window": window() }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .expect("content-type")
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .expect("content-disposition")
        .to_string();
    assert!(disposition.contains("adlens-campaign-2024-01-01-2024-01-02.csv"));

    let text = text_body(response).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "id,name,spend,clicks,impressions,revenue,ad_clicks,views,margin,roi,cpac,rpac"
    );
    assert!(lines[1].starts_with("c1,Spring Sale,150,15,1500,170,24,340,20,"));
    assert!(lines[2].starts_with("c2,'=Launch,80,"));
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_export_tsv_and_unknown_format() {
    let app = setup().await;
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/analysis/export?format=tsv",
            json!({ "level": "ad", "window": window() }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let text = text_body(response).await;
    assert!(text.starts_with("id\tname\tspend\t"));

    let response = app
        .oneshot(post_json(
            "/api/analysis/export?format=xlsx",
            json!({ "level": "ad", "window": window() }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["field"], "format");
}

#[tokio::test]
async fn test_empty_export_is_a_single_newline() {
    let app = setup().await;
    let response = app
        .oneshot(post_json(
            "/api/analysis/export",
            json!({ "level": "campaign" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await, "\n");
}

#[tokio::test]
async fn test_navigate_drills_into_campaign() {
    let app = setup().await;
    let body = json!({
        "state": { "window": window(), "page": 3 },
        "action": { "action": "drill_into", "id": "c1" }
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/analysis/navigate", body))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["state"]["level"], "adset");
    assert_eq!(data["state"]["campaign_scope"], json!(["c1"]));
    assert_eq!(data["state"]["page"], 1);
    assert_eq!(data["result"]["total_records"], 1);
    assert_eq!(data["result"]["page"][0]["id"], "s1");
    assert_eq!(data["result"]["page"][0]["revenue"], 170.0);

    let next = json!({
        "state": data["state"],
        "action": { "action": "drill_into", "id": "s1" }
    });
    let response = app
        .oneshot(post_json("/api/analysis/navigate", next))
        .await
        .expect("request");
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["state"]["level"], "ad");
    let ids: Vec<&str> = data["result"]["page"]
        .as_array()
        .expect("page")
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["a1", "a2"]);
}
