use api_lib::config::Config;
use api_lib::web::{router, AppState};
use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "blogtestboundary";

struct TestApp {
    router: Router,
    dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: tracing::Level::INFO,
        data_dir: dir.path().join("data"),
        upload_dir: dir.path().join("uploads"),
        max_upload_bytes: 1024 * 1024,
        session_ttl_hours: 1,
    };
    let state = AppState::from_config(Arc::new(config)).await.unwrap();
    TestApp {
        router: router(Arc::new(state)),
        dir,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, cookie, body)
}

fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn multipart_request(
    method: Method,
    uri: &str,
    cookie: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"media_files\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Registers and logs in `username`, returning the `Cookie` header value.
async fn login_as(app: &TestApp, username: &str) -> String {
    let creds = json!({ "username": username, "password": "secret" });
    let (status, _, _) = send(app, json_request(Method::POST, "/auth/register", None, creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, cookie, _) = send(app, json_request(Method::POST, "/auth/login", None, creds)).await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = cookie.expect("login sets a cookie");
    set_cookie.split(';').next().unwrap().to_string()
}

async fn create_post(app: &TestApp, cookie: &str, files: &[(&str, &[u8])]) -> Value {
    let request = multipart_request(
        Method::POST,
        "/posts",
        cookie,
        &[("title", "Hello"), ("content", "First post")],
        files,
    );
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn startup_creates_empty_collections() {
    let app = spawn_app().await;
    for file in ["users.json", "posts.json"] {
        let text = std::fs::read_to_string(app.dir.path().join("data").join(file)).unwrap();
        assert_eq!(text, "[]");
    }

    let (status, _, body) = send(&app, get("/posts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([]));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = spawn_app().await;
    login_as(&app, "alice").await;

    let creds = json!({ "username": "alice", "password": "other" });
    let (status, _, _) = send(&app, json_request(Method::POST, "/auth/register", None, creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn whitespace_password_is_rejected() {
    let app = spawn_app().await;
    let creds = json!({ "username": "ws", "password": "   " });
    let (status, _, _) = send(&app, json_request(Method::POST, "/auth/register", None, creds)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let users = std::fs::read_to_string(app.dir.path().join("data").join("users.json")).unwrap();
    assert_eq!(users, "[]");
}

#[tokio::test]
async fn logged_in_users_cannot_register_or_login_again() {
    let app = spawn_app().await;
    let cookie = login_as(&app, "alice").await;

    let other = json!({ "username": "carol", "password": "secret" });
    let (status, _, _) = send(&app, json_request(Method::POST, "/auth/register", Some(cookie.as_str()), other)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let same = json!({ "username": "alice", "password": "secret" });
    let (status, set_cookie, _) = send(&app, json_request(Method::POST, "/auth/login", Some(cookie.as_str()), same)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(set_cookie.is_none());

    let creds = json!({ "username": "carol", "password": "secret" });
    let (status, _, _) = send(&app, json_request(Method::POST, "/auth/login", None, creds)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    login_as(&app, "alice").await;

    let creds = json!({ "username": "alice", "password": "nope" });
    let (status, cookie, _) = send(&app, json_request(Method::POST, "/auth/login", None, creds)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
}

#[tokio::test]
async fn writes_require_a_session() {
    let app = spawn_app().await;
    let request = multipart_request(Method::POST, "/posts", "session=bogus", &[("title", "t"), ("content", "c")], &[]);
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = spawn_app().await;
    let cookie = login_as(&app, "alice").await;

    let me = Request::builder().uri("/auth/me").header(header::COOKIE, &cookie).body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["username"], "alice");

    let logout = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, logout).await;
    assert_eq!(status, StatusCode::OK);

    let me = Request::builder().uri("/auth/me").header(header::COOKIE, &cookie).body(Body::empty()).unwrap();
    let (status, _, _) = send(&app, me).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_post_stores_allowed_uploads_only() {
    let app = spawn_app().await;
    let cookie = login_as(&app, "alice").await;

    let saved = create_post(&app, &cookie, &[("pic.png", &b"png-bytes"[..]), ("run.sh", &b"echo"[..])]).await;

    assert_eq!(saved["rejected_files"], json!(["run.sh"]));
    let urls = saved["media_urls"].as_array().unwrap();
    assert_eq!(urls.len(), 1);
    let url = urls[0].as_str().unwrap();
    assert!(url.starts_with("/static/uploads/") && url.ends_with("_pic.png"));

    let (status, _, body) = send(&app, get(url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, &b"png-bytes"[..]);

    let id = saved["id"].as_str().unwrap();
    let (status, _, body) = send(&app, get(&format!("/posts/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let post: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(post["author"], "alice");
    assert_eq!(post["title"], "Hello");
    assert_eq!(post["comments"], json!([]));
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let app = spawn_app().await;
    let cookie = login_as(&app, "alice").await;
    let request = multipart_request(Method::POST, "/posts", &cookie, &[("title", ""), ("content", "c")], &[]);
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn edit_appends_media_and_checks_author() {
    let app = spawn_app().await;
    let alice = login_as(&app, "alice").await;
    let bob = login_as(&app, "bob").await;
    let saved = create_post(&app, &alice, &[("one.jpg", &b"1"[..])]).await;
    let id = saved["id"].as_str().unwrap();
    let uri = format!("/posts/{id}");

    let forbidden = multipart_request(Method::PUT, &uri, &bob, &[("title", "x"), ("content", "y")], &[]);
    let (status, _, _) = send(&app, forbidden).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let edit = multipart_request(
        Method::PUT,
        &uri,
        &alice,
        &[("title", "Edited"), ("content", "Changed")],
        &[("two.gif", &b"2"[..])],
    );
    let (status, _, _) = send(&app, edit).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = send(&app, get(&uri)).await;
    let post: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(post["title"], "Edited");
    let urls: Vec<&str> = post["media_urls"].as_array().unwrap().iter().map(|u| u.as_str().unwrap()).collect();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("_one.jpg"));
    assert!(urls[1].ends_with("_two.gif"));

    let missing = multipart_request(Method::PUT, "/posts/missing", &alice, &[("title", "x"), ("content", "y")], &[]);
    let (status, _, _) = send(&app, missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_author_can_delete() {
    let app = spawn_app().await;
    let alice = login_as(&app, "alice").await;
    let bob = login_as(&app, "bob").await;
    let saved = create_post(&app, &alice, &[]).await;
    let uri = format!("/posts/{}", saved["id"].as_str().unwrap());

    let delete = |cookie: &str| {
        Request::builder()
            .method(Method::DELETE)
            .uri(&uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _, _) = send(&app, delete(bob.as_str())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, delete(alice.as_str())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, delete(alice.as_str())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_append_to_post() {
    let app = spawn_app().await;
    let alice = login_as(&app, "alice").await;
    let bob = login_as(&app, "bob").await;
    let saved = create_post(&app, &alice, &[]).await;
    let uri = format!("/posts/{}/comments", saved["id"].as_str().unwrap());

    let (status, _, _) = send(&app, json_request(Method::POST, &uri, Some(bob.as_str()), json!({ "text": "first" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, body) = send(&app, json_request(Method::POST, &uri, Some(alice.as_str()), json!({ "text": "second" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let post: Value = serde_json::from_slice(&body).unwrap();
    let comments = post["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["author"], "bob");
    assert_eq!(comments[0]["text"], "first");
    assert_eq!(comments[1]["author"], "alice");

    let (status, _, _) = send(&app, json_request(Method::POST, &uri, Some(bob.as_str()), json!({ "text": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        json_request(Method::POST, "/posts/missing/comments", Some(bob.as_str()), json!({ "text": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn slow_edit_upload_does_not_block_other_writes() {
    let app = spawn_app().await;
    let alice = login_as(&app, "alice").await;
    let saved = create_post(&app, &alice, &[]).await;
    let id = saved["id"].as_str().unwrap().to_string();

    let (body_tx, body_rx) = futures::channel::mpsc::unbounded::<Result<Bytes, std::io::Error>>();
    body_tx
        .unbounded_send(Ok(Bytes::from(format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nSlow edit\r\n"
        ))))
        .unwrap();
    let edit = Request::builder()
        .method(Method::PUT)
        .uri(format!("/posts/{id}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, &alice)
        .body(Body::from_stream(body_rx))
        .unwrap();
    let pending_edit = tokio::spawn(app.router.clone().oneshot(edit));
    // Let the edit handler start waiting on the rest of its body.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let comment = json_request(
        Method::POST,
        &format!("/posts/{id}/comments"),
        Some(alice.as_str()),
        json!({ "text": "while editing" }),
    );
    let (status, _, _) = tokio::time::timeout(Duration::from_secs(5), send(&app, comment))
        .await
        .expect("comment must not wait for the edit body");
    assert_eq!(status, StatusCode::CREATED);

    body_tx
        .unbounded_send(Ok(Bytes::from(format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\nFinally\r\n--{BOUNDARY}--\r\n"
        ))))
        .unwrap();
    drop(body_tx);
    let response = pending_edit.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, _, body) = send(&app, get(&format!("/posts/{id}"))).await;
    let post: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(post["title"], "Slow edit");
    assert_eq!(post["comments"][0]["text"], "while editing");
}

#[tokio::test]
async fn failed_save_removes_stored_uploads() {
    let app = spawn_app().await;
    let alice = login_as(&app, "alice").await;

    // A directory in place of the posts file makes every post write fail.
    let posts_file = app.dir.path().join("data").join("posts.json");
    std::fs::remove_file(&posts_file).unwrap();
    std::fs::create_dir(&posts_file).unwrap();

    let request = multipart_request(
        Method::POST,
        "/posts",
        &alice,
        &[("title", "Hello"), ("content", "Lost")],
        &[("pic.png", &b"png-bytes"[..])],
    );
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let leftovers = std::fs::read_dir(app.dir.path().join("uploads")).unwrap().count();
    assert_eq!(leftovers, 0);
}
