mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{list, seed_user};
use social_graph::api::{cors_layer, create_router};
use social_graph::app_state::AppState;
use social_graph::config::{AuthConfig, Config, DatabaseConfig, ModerationConfig, ServerConfig};
use social_graph::infrastructure::EntityStore;
use social_graph::models::{AssocType, UserId};

fn test_config(owner: UserId) -> Config {
    Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            node_id: 0,
            cors_origins: vec!["http://localhost:5173".to_string()],
        },
        auth: AuthConfig {
            secret_key: "api-secret".to_string(),
            owner_id: Some(owner),
            session_ttl_hours: 24,
            secure_cookies: false,
        },
        moderation: ModerationConfig {
            blocked_terms: vec!["badword".to_string()],
            reserved_terms: vec![],
        },
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, cookie, body)
}

fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_session_flow_and_owner_rules() {
    let store = EntityStore::new_in_memory().await.unwrap();
    let owner = seed_user(&store, "owner").await;
    let state = AppState::with_store(test_config(owner), store.clone());
    let app = create_router(state.clone());

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/user/register",
            json!({"username": "nina", "email": "nina@example.com", "password": "hunter22"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let nina = body["user"]["id"].as_i64().unwrap();

    let (status, set_cookie, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/user/login",
            json!({"email": "nina@example.com", "password": "hunter22"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "nina");
    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    let session = set_cookie.split(';').next().unwrap().to_string();
    assert!(session.starts_with("token="));

    let (status, _, body) = send(&app, empty_request("GET", "/api/v1/post/all", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _, body) = send(&app, empty_request("GET", "/api/v1/post/all", Some(&session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"], json!([]));

    // Registration followed the owner, so the toggle tries to unfollow and is refused.
    let uri = format!("/api/v1/user/followorunfollow/{}", owner);
    let (status, _, _) = send(&app, empty_request("POST", &uri, Some(&session))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(list(&store, nina, AssocType::Following).await, vec![owner]);

    let uri = format!("/api/v1/user/{}", owner);
    let (status, _, _) = send(&app, empty_request("DELETE", &uri, Some(&session))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner_session = format!("token={}", state.sessions.issue(owner).unwrap());
    let uri = format!("/api/v1/user/{}", nina);
    let (status, _, body) = send(&app, empty_request("DELETE", &uri, Some(&owner_session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let uri = format!("/api/v1/user/{}/followers", owner);
    let (status, _, body) = send(&app, empty_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["followers"], json!([]));

    let (status, cleared, _) = send(&app, empty_request("GET", "/api/v1/user/logout", Some(&session))).await;
    assert_eq!(status, StatusCode::OK);
    let cleared = cleared.unwrap();
    assert!(cleared.starts_with("token=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_post_comment_and_bookmark_over_http() {
    let store = EntityStore::new_in_memory().await.unwrap();
    let owner = seed_user(&store, "owner").await;
    let alice = seed_user(&store, "alice").await;
    let state = AppState::with_store(test_config(owner), store.clone());
    let app = create_router(state.clone());
    let session = format!("token={}", state.sessions.issue(alice).unwrap());

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/post/addpost",
            json!({"caption": "hello", "image": "https://cdn.example.com/1.jpg"}),
            Some(&session),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post = body["post"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/post/{}/comment", post);
    let (status, _, body) = send(
        &app,
        json_request("POST", &uri, json!({"text": "so BADWORD"}), Some(&session)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _, _) = send(
        &app,
        json_request("POST", &uri, json!({"text": "lovely"}), Some(&session)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/post/{}/bookmark", post);
    let (status, _, body) = send(&app, empty_request("GET", &uri, Some(&session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "saved");

    let uri = format!("/api/v1/post/{}/like", 999);
    let (status, _, _) = send(&app, empty_request("GET", &uri, Some(&session))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/post/delete/{}", post);
    let (status, _, _) = send(&app, empty_request("DELETE", &uri, Some(&session))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list(&store, alice, AssocType::Bookmarks).await.is_empty());
}

#[tokio::test]
async fn test_cors_allows_credentials_for_configured_origin() {
    let store = EntityStore::new_in_memory().await.unwrap();
    let owner = seed_user(&store, "owner").await;
    let state = AppState::with_store(test_config(owner), store);
    let app = create_router(state.clone()).layer(cors_layer(&state.config.server.cors_origins));

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/post/all")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(preflight("http://localhost:5173")).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );

    let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
