mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::TestEnv;

const BOUNDARY: &str = "docport-test-boundary";

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, bytes) = send(app, request).await;
    (status, parse(&bytes))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, bytes) = send(app, request).await;
    (status, parse(&bytes))
}

fn parse(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap()
    }
}

fn upload_request(file_id: i64, field: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/files/{file_id}/upload"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create_file(app: &Router, name: &str) -> i64 {
    let (status, body) = send_json(app, "POST", "/api/v1/files", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn heartbeat_and_docs_are_served() {
    let env = TestEnv::new().await;
    let app = env.router();

    let (status, body) = get(&app, "/heartbeat").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/files/{fileId}/upload"].is_object());
}

#[tokio::test]
async fn project_crud_round_trip() {
    let env = TestEnv::new().await;
    let app = env.router();

    let (status, created) = send_json(
        &app,
        "POST",
        "/api/v1/projects",
        json!({ "slug": "docport", "name": "DocPort" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "docport");
    assert!(created["createdAt"].is_string());
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/projects/{id}"),
        json!({ "name": "DocPort Server" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "DocPort Server");
    assert_eq!(updated["slug"], "docport");

    let (status, list) = get(&app, "/api/v1/projects?limit=500&offset=-3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["limit"], 100);
    assert_eq!(list["offset"], 0);

    let (status, conflict) = send_json(
        &app,
        "POST",
        "/api/v1/projects",
        json!({ "slug": "docport", "name": "Again" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["code"], "CONFLICT");

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/projects/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get(&app, &format!("/api/v1/projects/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn upload_then_download_with_ranges() {
    let env = TestEnv::new().await;
    let app = env.router();
    let id = create_file(&app, "a.pdf").await;

    let (status, pending) = get(&app, &format!("/api/v1/files/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["isComplete"], false);
    assert!(pending["size"].is_null());
    assert!(pending.get("path").is_none());

    let content = b"%PDF-1.4 demo";
    let (status, _, body) = send(&app, upload_request(id, "file", content)).await;
    assert_eq!(status, StatusCode::OK);
    let uploaded = parse(&body);
    assert_eq!(uploaded["isComplete"], true);
    assert_eq!(uploaded["size"], 13);
    assert_eq!(uploaded["mimeType"], "application/pdf");

    let request = Request::builder()
        .uri(format!("/api/v1/files/{id}/download"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, content);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(headers[header::CONTENT_LENGTH], "13");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"a.pdf\""
    );
    assert!(headers.contains_key(header::LAST_MODIFIED));

    let request = Request::builder()
        .uri(format!("/api/v1/files/{id}/download"))
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body, b"%PDF");
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 0-3/13");

    let request = Request::builder()
        .uri(format!("/api/v1/files/{id}/download"))
        .header(header::RANGE, "bytes=-4")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body, b"demo");

    let request = Request::builder()
        .uri(format!("/api/v1/files/{id}/download"))
        .header(header::RANGE, "bytes=50-")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(headers[header::CONTENT_RANGE], "bytes */13");
}

#[tokio::test]
async fn upload_state_errors_map_to_status_codes() {
    let env = TestEnv::new().await;
    let app = env.router();
    let id = create_file(&app, "notes.txt").await;

    let (status, body) = get(&app, &format!("/api/v1/files/{id}/download")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _, _) = send(&app, upload_request(id, "file", b"hello")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, upload_request(id, "file", b"again")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse(&body)["code"], "CONFLICT");

    let (status, _, _) = send(&app, upload_request(9999, "file", b"x")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let env = TestEnv::new().await;
    let app = env.router();
    let id = create_file(&app, "x.bin").await;

    let (status, _, body) = send(&app, upload_request(id, "attachment", b"data")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn deleted_file_cannot_be_downloaded() {
    let env = TestEnv::new().await;
    let app = env.router();
    let id = create_file(&app, "temp.txt").await;
    send(&app, upload_request(id, "file", b"short lived")).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/files/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, &format!("/api/v1/files/{id}/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(env.blobs().await.is_empty());
}

#[tokio::test]
async fn attach_and_detach_through_the_api() {
    let env = TestEnv::new().await;
    let app = env.router();

    let (_, project) = send_json(
        &app,
        "POST",
        "/api/v1/projects",
        json!({ "slug": "docs", "name": "Docs" }),
    )
    .await;
    let (status, version) = send_json(
        &app,
        "POST",
        "/api/v1/versions",
        json!({ "projectId": project["id"], "name": "1.0", "description": "initial" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(version["projectId"], project["id"]);
    let version_id = version["id"].as_i64().unwrap();
    let file_id = create_file(&app, "guide.pdf").await;

    let attach = format!("/api/v1/versions/{version_id}/attach-file");
    let (status, _) = send_json(&app, "POST", &attach, json!({ "fileId": file_id })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send_json(&app, "POST", &attach, json!({ "fileId": file_id })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, list) = get(&app, &format!("/api/v1/files?versionId={version_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"][0]["id"], file_id);

    let (status, versions) =
        get(&app, &format!("/api/v1/versions?projectId={}", project["id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(versions["total"], 1);

    let detach = format!("/api/v1/versions/{version_id}/detach-file");
    let (status, _) = send_json(&app, "POST", &detach, json!({ "fileId": file_id })).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send_json(&app, "POST", &detach, json!({ "fileId": file_id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let env = TestEnv::new().await;
    let app = env.router();

    let (status, body) = get(&app, "/api/v1/files/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = get(&app, "/api/v1/files?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/files")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["code"], "BAD_REQUEST");

    let (status, body) = send_json(&app, "POST", "/api/v1/files", json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let env = TestEnv::new().await;
    let app = env.router();
    let id = create_file(&app, "big.bin").await;
    let content = vec![b'x'; common::MAX_UPLOAD_SIZE + 1024];

    let (status, _, _) = send(&app, upload_request(id, "file", &content)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(env.blobs().await.is_empty());
}
