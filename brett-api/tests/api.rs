use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use brett_api::server::{self, ServerState, SessionTtl};
use brett_db::client::DbClient;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn app(pool: PgPool) -> Router {
    let state = ServerState {
        db_client: Arc::new(DbClient::new(pool)),
        session_ttl: SessionTtl(None),
    };

    server::routes().with_state(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    builder.body(Body::empty()).unwrap()
}

/// Reconciles an identity and returns the session token for it.
async fn sync_identity(app: &Router, identifier: &Uuid, name: &str, is_admin: bool) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/users/sync",
            None,
            &json!({
                "identifier": identifier.to_string(),
                "display_name": name,
                "is_admin": is_admin,
            }),
        ),
    )
    .await;

    assert!(status == StatusCode::CREATED || status == StatusCode::OK);
    body["session_token"].as_str().unwrap().to_owned()
}

#[sqlx::test(migrations = "../migrations")]
async fn created_public_post_appears_in_list(pool: PgPool) {
    let app = app(pool);

    let (status, body) = send(&app, get_request("/api/posts", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            None,
            &json!({"title": "게시글1", "content": "내용1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "게시글1");
    assert_eq!(created["author"], "Anonymous");
    assert_eq!(created["private"], false);

    let (status, body) = send(&app, get_request("/api/posts", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["posts"][0]["title"], "게시글1");
    assert_eq!(body["posts"][0]["content"], "내용1");
}

#[sqlx::test(migrations = "../migrations")]
async fn anonymous_private_post_is_rejected_before_persistence(pool: PgPool) {
    let app = app(pool);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            None,
            &json!({"title": "secret", "content": "hidden", "private": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (_, body) = send(&app, get_request("/api/posts", None)).await;
    assert_eq!(body["count"], 0);
}

#[sqlx::test(migrations = "../migrations")]
async fn private_post_detail_is_gated_by_ownership_and_admin(pool: PgPool) {
    let app = app(pool);

    let author_token = sync_identity(&app, &Uuid::new_v4(), "author", false).await;
    let other_token = sync_identity(&app, &Uuid::new_v4(), "other", false).await;
    let admin_token = sync_identity(&app, &Uuid::new_v4(), "admin", true).await;

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            Some(&author_token),
            &json!({"title": "비밀글", "content": "비밀 내용", "private": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = created["id"].as_i64().unwrap();
    let uri = format!("/api/posts/{post_id}");

    let (status, detail) = send(&app, get_request(&uri, Some(&author_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "비밀글");

    let (status, _) = send(&app, get_request(&uri, Some(&other_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get_request(&uri, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, detail) = send(&app, get_request(&uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "비밀글");
}

#[sqlx::test(migrations = "../migrations")]
async fn private_post_comments_are_gated_like_reads(pool: PgPool) {
    let app = app(pool);

    let author_token = sync_identity(&app, &Uuid::new_v4(), "author", false).await;
    let other_token = sync_identity(&app, &Uuid::new_v4(), "other", false).await;
    let admin_token = sync_identity(&app, &Uuid::new_v4(), "admin", true).await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            Some(&author_token),
            &json!({"title": "secret", "content": "hidden", "private": true}),
        ),
    )
    .await;
    let uri = format!("/api/posts/{}/comments", created["id"].as_i64().unwrap());
    let comment = json!({"content": "a comment"});

    let (status, _) = send(&app, json_request("POST", &uri, None, &comment)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, json_request("POST", &uri, Some(&other_token), &comment)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, json_request("POST", &uri, Some(&author_token), &comment)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, json_request("POST", &uri, Some(&admin_token), &comment)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"], "Anonymous");
}

#[sqlx::test(migrations = "../migrations")]
async fn private_post_is_redacted_in_list_but_keeps_comment_count(pool: PgPool) {
    let app = app(pool);

    let author_token = sync_identity(&app, &Uuid::new_v4(), "author", false).await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            Some(&author_token),
            &json!({
                "title": "비밀글",
                "content": "비밀 내용",
                "tags": ["secret-project"],
                "private": true,
            }),
        ),
    )
    .await;
    let post_id = created["id"].as_i64().unwrap();

    let comments_uri = format!("/api/posts/{post_id}/comments");
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &comments_uri,
            Some(&author_token),
            &json!({"content": "progress update"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get_request("/api/posts", None)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = &body["posts"][0];
    assert_eq!(listed["title"], "This post is private.");
    assert_eq!(listed["content"], "");
    assert_eq!(listed["tags"], json!([]));
    assert_eq!(listed["private"], true);
    assert_eq!(listed["comment_count"], 1);

    let (_, body) = send(&app, get_request("/api/posts", Some(&author_token))).await;
    let listed = &body["posts"][0];
    assert_eq!(listed["title"], "비밀글");
    assert_eq!(listed["tags"], json!(["secret-project"]));
}

#[sqlx::test(migrations = "../migrations")]
async fn reconciliation_is_idempotent_on_identifier(pool: PgPool) {
    let app = app(pool);
    let identifier = Uuid::new_v4();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/users/sync",
            None,
            &json!({"identifier": identifier.to_string(), "display_name": "first"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["display_name"], "first");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/users/sync",
            None,
            &json!({
                "identifier": identifier.to_string(),
                "display_name": "second",
                "is_admin": true,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["display_name"], "second");
    assert_eq!(body["user"]["is_admin"], true);

    let token = body["session_token"].as_str().unwrap();
    let (status, body) = send(&app, get_request("/api/users/me", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "second");
    assert_eq!(body["is_admin"], true);
}

#[sqlx::test(migrations = "../migrations")]
async fn malformed_identifier_is_a_client_error(pool: PgPool) {
    let app = app(pool);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/users/sync",
            None,
            &json!({"identifier": "not-a-uuid", "display_name": "tester"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, get_request("/api/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../migrations")]
async fn oversized_bodies_are_rejected_before_parsing(pool: PgPool) {
    let app = app(pool);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            None,
            &json!({"title": "big", "content": "a".repeat(60_000)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("KiB"));
}

#[sqlx::test(migrations = "../migrations")]
async fn overlong_title_is_rejected_with_field_message(pool: PgPool) {
    let app = app(pool);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            None,
            &json!({"title": "a".repeat(201), "content": "content"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (_, body) = send(&app, get_request("/api/posts", None)).await;
    assert_eq!(body["count"], 0);
}

#[sqlx::test(migrations = "../migrations")]
async fn markup_in_posts_is_escaped(pool: PgPool) {
    let app = app(pool);

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            None,
            &json!({"title": "<script>alert('x')</script>", "content": "fine"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let title = created["title"].as_str().unwrap();
    assert!(!title.contains('<'));
    assert!(title.contains("&lt;script&gt;"));
}

#[sqlx::test(migrations = "../migrations")]
async fn update_and_delete_respect_the_access_policy(pool: PgPool) {
    let app = app(pool);

    let author_token = sync_identity(&app, &Uuid::new_v4(), "author", false).await;
    let other_token = sync_identity(&app, &Uuid::new_v4(), "other", false).await;

    let (_, created) = send(
        &app,
        json_request(
            "POST",
            "/api/posts/create",
            Some(&author_token),
            &json!({"title": "draft", "content": "wip", "private": true}),
        ),
    )
    .await;
    let post_id = created["id"].as_i64().unwrap();
    let uri = format!("/api/posts/{post_id}");

    let patch = json!({"title": "final", "resolved": true});
    let (status, _) = send(&app, json_request("PUT", &uri, Some(&other_token), &patch)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(&app, json_request("PUT", &uri, Some(&author_token), &patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "final");
    assert_eq!(updated["content"], "wip");
    assert_eq!(updated["resolved"], true);

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {other_token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {author_token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, get_request(&uri, Some(&author_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../migrations")]
async fn missing_post_is_not_found(pool: PgPool) {
    let app = app(pool);

    let (status, body) = send(&app, get_request("/api/posts/12345", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[sqlx::test(migrations = "../migrations")]
async fn tags_accumulate_across_posts(pool: PgPool) {
    let app = app(pool);

    for (title, tags) in [("one", json!(["build"])), ("two", json!(["build", "ci"]))] {
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/posts/create",
                None,
                &json!({"title": title, "content": "content", "tags": tags}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, get_request("/api/tags", None)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["build", "ci"]);
}
