use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;
use time::macros::datetime;
use time::OffsetDateTime;
use tower::ServiceExt;
use trendwatch_core::persist::save_snapshot;
use trendwatch_core::{DatasetSnapshot, VideoRecord};

fn video(id: &str, title: &str, views: u64, published_at: OffsetDateTime) -> VideoRecord {
    VideoRecord {
        id: id.into(),
        title: title.into(),
        description: String::new(),
        channel: "demo".into(),
        published_at,
        view_count: views,
        like_count: 1,
        comment_count: 1,
        duration_secs: 30,
        url: VideoRecord::watch_url(id),
        thumbnail_url: VideoRecord::default_thumbnail(id),
    }
}

fn write_tiny_dataset(path: &Path) {
    let snap = DatasetSnapshot::assemble(
        "ai",
        10,
        datetime!(2025-01-10 00:00 UTC),
        2,
        vec![
            video("1", "AI makeup tutorial", 500, datetime!(2025-01-01 00:00 UTC)),
            video("2", "AI cat shorts", 9000, datetime!(2025-01-02 00:00 UTC)),
        ],
    )
    .unwrap();
    save_snapshot(path, &snap).unwrap();
}

fn app_for(dir: &Path, configure: impl FnOnce(&mut server::ServerConfig)) -> Router {
    let path = dir.join("shorts.twds");
    write_tiny_dataset(&path);
    let mut config = server::ServerConfig::new(&path);
    configure(&mut config);
    server::build_app(config).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn tool(name: &str, arguments: Value) -> Request<Body> {
    Request::post("/tools/call")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": name, "arguments": arguments }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |_| {});

    let (status, json) = send(app, tool("search", json!({"query": "ai", "limit": 10}))).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], "2");
    assert_eq!(arr[1]["id"], "1");
    assert_eq!(arr[0]["score"], 1);
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn unmatched_search_is_empty_list() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |_| {});
    let (status, json) = send(app, tool("search", json!({"query": "zebra", "limit": 5}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn errors_use_the_boundary_shape() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |_| {});

    let (status, json) = send(app.clone(), tool("search", json!({"query": "", "limit": 5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_argument");

    let (status, json) = send(app.clone(), tool("fetch", json!({"id": "nonexistent"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");

    let (status, json) = send(app, tool("transcribe", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "tool_not_found");
}

#[tokio::test]
async fn fetch_returns_full_record() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |_| {});
    let (status, json) = send(app, tool("fetch", json!({"id": "1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "AI makeup tutorial");
    assert_eq!(json["view_count"], 500);
    assert_eq!(json["url"], "https://www.youtube.com/watch?v=1");
    assert_eq!(json["published_at"], "2025-01-01T00:00:00Z");
}

#[tokio::test]
async fn bearer_token_is_enforced_when_configured() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |c| c.api_token = Some("s3cret".into()));

    let (status, _) = send(app.clone(), tool("search", json!({"query": "ai"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut req = tool("search", json!({"query": "ai"}));
    req.headers_mut().insert("authorization", "Bearer s3cret".parse().unwrap());
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_reload_swaps_dataset_and_survives_bad_files() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |c| c.admin_token = Some("admin".into()));
    let path = dir.path().join("shorts.twds");
    let reload = || {
        Request::post("/admin/reload")
            .header("X-ADMIN-TOKEN", "admin")
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(app.clone(), Request::post("/admin/reload").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    std::fs::write(&path, b"not a dataset").unwrap();
    let (status, json) = send(app.clone(), reload()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "corrupt_dataset");
    let (_, json) = send(app.clone(), tool("fetch", json!({"id": "2"}))).await;
    assert_eq!(json["title"], "AI cat shorts");

    let replacement = DatasetSnapshot::assemble(
        "zebra",
        1,
        datetime!(2025-02-01 00:00 UTC),
        1,
        vec![video("z", "Zebra dance", 7, datetime!(2025-01-30 00:00 UTC))],
    )
    .unwrap();
    save_snapshot(&path, &replacement).unwrap();
    let (status, json) = send(app.clone(), reload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["generation"], 1);
    assert_eq!(json["records"], 1);

    let (_, json) = send(app.clone(), tool("search", json!({"query": "zebra"}))).await;
    assert_eq!(json["results"][0]["id"], "z");
    let (_, json) = send(app.clone(), Request::get("/dataset").body(Body::empty()).unwrap()).await;
    assert_eq!(json["meta"]["query"], "zebra");
    assert_eq!(json["generation"], 1);
}

#[tokio::test]
async fn tool_catalog_lists_search_and_fetch() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |_| {});
    let (status, json) = send(app, Request::get("/tools").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json["tools"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["search", "fetch"]);
}

#[test]
fn startup_rejects_corrupt_dataset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.twds");
    std::fs::write(&path, b"garbage").unwrap();
    assert!(server::build_app(server::ServerConfig::new(&path)).is_err());
}

fn raw_call(body: &str, content_type: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/tools/call");
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn malformed_requests_get_the_boundary_error_shape() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |_| {});

    for req in [
        raw_call(r#"{"arguments": {"query": "ai"}}"#, Some("application/json")),
        raw_call("{not json", Some("application/json")),
        raw_call(r#"{"name": "search", "arguments": {"query": "ai"}}"#, None),
    ] {
        let (status, json) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "invalid_argument");
        assert!(json["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn missing_token_is_checked_before_the_body() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), |c| c.api_token = Some("s3cret".into()));

    for req in [
        raw_call(r#"{"arguments": {}}"#, Some("application/json")),
        raw_call("{not json", Some("application/json")),
        raw_call("", None),
    ] {
        let (status, json) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");
    }
}
