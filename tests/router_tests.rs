use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use testimonial_vault::db::{Database, DbSettings};
use testimonial_vault::router::{VaultState, vault_router};
use tower::ServiceExt;

async fn ready_app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = Database::connect(DbSettings::embedded(dir.path()))
        .await
        .expect("database init failed");
    (dir, vault_router(VaultState::new(db)))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("response body was not json")
}

fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    file: (&str, &str, &str, &[u8]),
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    let (field, file_name, content_type, data) = file;
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from(body))
        .expect("failed to build request")
}

#[tokio::test]
async fn requests_wait_for_initialization() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = Database::new(DbSettings::embedded(dir.path()));
    let app = vault_router(VaultState::new(db.clone()));

    let init = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        db.initialize().await
    });

    let (status, body) = send(&app, get("/api/testimonials")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!([]));
    init.await
        .expect("init task panicked")
        .expect("database init failed");
}

#[tokio::test]
async fn routes_return_503_while_initialization_is_pending() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db = Database::new(DbSettings::embedded(dir.path()));
    let state = VaultState::new(db).with_ready_timeout(Duration::from_millis(50));
    let app = vault_router(state);

    let (status, body) = send(&app, get("/api/testimonials")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["error"]["code"], "NOT_READY");

    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["error"]["code"], "NOT_READY");
}

#[tokio::test]
async fn failed_initialization_returns_503_without_waiting() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    // A regular file where the data directory should be.
    let blocker = dir.path().join("data");
    std::fs::write(&blocker, b"not a directory").expect("failed to write blocker");
    let db = Database::new(DbSettings::embedded(blocker.join("nested")));
    assert!(db.initialize().await.is_err());

    let app = vault_router(VaultState::new(db));
    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        send(&app, get("/api/testimonials")),
    )
    .await
    .expect("request must not wait for a failed database");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["error"]["code"], "UNAVAILABLE");
}

#[tokio::test]
async fn health_reports_backend_and_count() {
    let (_dir, app) = ready_app().await;
    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["database"], "embedded");
    assert_eq!(v["testimonial_count"], 0);
}

#[tokio::test]
async fn written_testimonial_lifecycle() {
    let (_dir, app) = ready_app().await;

    let payload = serde_json::json!({
        "name": "Ada",
        "email": "ada@example.com",
        "testimonial": "Smooth",
        "use_case": "mapping",
    })
    .to_string();
    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/submit-written-testimonial")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .expect("failed to build request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let uuid = json(&body)["uuid"].as_str().expect("uuid").to_string();

    let (status, body) = send(&app, get(&format!("/api/testimonial/{uuid}"))).await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v["name"], "Ada");
    assert_eq!(v["testimonial_text"], "Smooth");
    assert_eq!(v["use_case"], "mapping");
    assert_eq!(v["testimonial_type"], "written");

    let (_, body) = send(&app, get("/api/testimonials")).await;
    assert_eq!(json(&body).as_array().map(Vec::len), Some(1));

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/testimonial/{uuid}"))
            .body(Body::empty())
            .expect("failed to build request")
    };
    assert_eq!(send(&app, delete()).await.0, StatusCode::OK);
    assert_eq!(send(&app, delete()).await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&app, get(&format!("/api/testimonial/{uuid}"))).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn photo_upload_is_served_back() {
    let (_dir, app) = ready_app().await;
    let body = multipart_body(
        "XBOUNDARY",
        &[("name", "Lin"), ("email", "lin@example.com")],
        ("photo", "shot.png", "image/png", &[0x89, b'P', b'N', b'G']),
    );
    let (status, body) = send(&app, multipart_request("/submit-photo-testimonial", body)).await;
    assert_eq!(status, StatusCode::OK);
    let uuid = json(&body)["uuid"].as_str().expect("uuid").to_string();

    let (_, body) = send(&app, get(&format!("/api/testimonial/{uuid}"))).await;
    let v = json(&body);
    assert_eq!(v["has_media"], true);
    let media_file = v["media_file"].as_str().expect("media_file").to_string();
    assert!(media_file.ends_with(".png"));

    let resp = app
        .clone()
        .oneshot(get(&format!("/uploads/{media_file}")))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        resp.headers()[header::CACHE_CONTROL],
        "public, max-age=31536000"
    );
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']);

    assert_eq!(send(&app, get("/uploads/unknown.png")).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_media_upload_is_rejected() {
    let (_dir, app) = ready_app().await;
    let body = multipart_body(
        "XBOUNDARY",
        &[("name", "Lin"), ("email", "lin@example.com")],
        ("video", "notes.txt", "text/plain", b"hi"),
    );
    let (status, _) = send(&app, multipart_request("/submit-video-testimonial", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn asset_upload_update_and_download() {
    let (_dir, app) = ready_app().await;
    let body = multipart_body(
        "XBOUNDARY",
        &[("name", "Logo"), ("asset_type", "logo")],
        ("asset", "logo.svg", "image/svg+xml", b"<svg/>"),
    );
    let (status, body) = send(&app, multipart_request("/api/assets/upload", body)).await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v["asset"]["file_size"], 6);
    let uuid = v["asset"]["uuid"].as_str().expect("uuid").to_string();

    let (status, _) = send(
        &app,
        Request::builder()
            .method("PUT")
            .uri(format!("/api/assets/{uuid}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Logo v2","description":null,"asset_type":"logo"}"#))
            .expect("failed to build request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, get(&format!("/api/assets/{uuid}"))).await;
    assert_eq!(json(&body)["name"], "Logo v2");

    let resp = app
        .clone()
        .oneshot(get(&format!("/assets/{uuid}")))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=\"logo.svg\""
    );

    assert_eq!(send(&app, get("/api/assets/nope")).await.0, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, get("/assets/nope")).await.0, StatusCode::NOT_FOUND);
}
