use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

mod common {
    pub use crate::helpers::*;
}

async fn create_post(app: &common::TestApp, access: &str, title: &str, content: &str) -> Value {
    let (status, body) = common::call(
        app,
        Method::POST,
        "/api/posts/",
        Some(json!({"title": title, "content": content})),
        Some(access),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

#[tokio::test]
async fn test_posts_require_authentication() {
    let app = common::setup_test_app().await;

    let (status, _) = common::call(&app, Method::GET, "/api/posts/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/posts/",
        Some(json!({"title": "Hi", "content": "There"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_post_generates_unique_slugs() {
    let app = common::setup_test_app().await;
    let (username, access, _) = common::create_verified_user(&app).await;

    let first = create_post(&app, &access, "Hello, World!", "First body").await;
    assert_eq!(first["slug"], "hello-world");
    assert_eq!(first["author"], username);
    assert_eq!(first["likes_count"], 0);
    assert_eq!(first["comments_count"], 0);
    assert_eq!(first["shares_count"], 0);
    assert!(first["image"].is_null());

    let second = create_post(&app, &access, "Hello World", "Second body").await;
    assert_eq!(second["slug"], "hello-world-1");
    let third = create_post(&app, &access, "hello   world", "Third body").await;
    assert_eq!(third["slug"], "hello-world-2");

    let (status, body) = common::call(
        &app,
        Method::GET,
        "/api/posts/hello-world-1/",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Second body");
}

#[tokio::test]
async fn test_slug_keeps_base_letters_of_accented_titles() {
    let app = common::setup_test_app().await;
    let (_, access, _) = common::create_verified_user(&app).await;

    let post = create_post(&app, &access, "Café crème", "Morning notes").await;
    assert_eq!(post["slug"], "cafe-creme");

    let post = create_post(&app, &access, "Über Résumé tips", "Notes").await;
    assert_eq!(post["slug"], "uber-resume-tips");
}

#[tokio::test]
async fn test_create_post_validation() {
    let app = common::setup_test_app().await;
    let (_, access, _) = common::create_verified_user(&app).await;

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/posts/",
        Some(json!({"title": "x".repeat(201), "content": ""})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["subErrors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_posts_paginates_newest_first() {
    let app = common::setup_test_app().await;
    let (_, access, _) = common::create_verified_user(&app).await;
    for i in 0..3 {
        create_post(&app, &access, &format!("Post {i}"), "body").await;
    }

    let (status, body) = common::call(
        &app,
        Method::GET,
        "/api/posts/?page=1&page_size=2",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 2);
    assert_eq!(body["total_pages"], 2);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["title"], "Post 2");
    assert_eq!(results[1]["title"], "Post 1");

    let (status, body) = common::call(
        &app,
        Method::GET,
        "/api/posts?page=2&page_size=2",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["title"], "Post 0");

    let (status, body) = common::call(
        &app,
        Method::GET,
        "/api/posts/?page=3&page_size=2",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["debugMessage"], "Invalid page.");
}

#[tokio::test]
async fn test_empty_list_has_one_page() {
    let app = common::setup_test_app().await;
    let (_, access, _) = common::create_verified_user(&app).await;

    let (status, body) = common::call(&app, Method::GET, "/api/posts/", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_only_author_can_modify_post() {
    let app = common::setup_test_app().await;
    let (_, author, _) = common::create_verified_user(&app).await;
    let (_, stranger, _) = common::create_verified_user(&app).await;
    create_post(&app, &author, "Mine", "Original").await;

    let (status, body) = common::call(
        &app,
        Method::PATCH,
        "/api/posts/mine/",
        Some(json!({"content": "Hijacked"})),
        Some(&stranger),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["debugMessage"], "You can only edit your own posts");

    let (status, _) =
        common::call(&app, Method::DELETE, "/api/posts/mine/", None, Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = common::call(
        &app,
        Method::PUT,
        "/api/posts/mine/",
        Some(json!({"title": "Mine, renamed", "content": "Edited", "image": "https://cdn.example.com/p.png"})),
        Some(&author),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "mine");
    assert_eq!(body["title"], "Mine, renamed");
    assert_eq!(body["image"], "https://cdn.example.com/p.png");

    let (status, body) = common::call(
        &app,
        Method::PATCH,
        "/api/posts/mine/",
        Some(json!({"content": "Patched"})),
        Some(&author),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Mine, renamed");
    assert_eq!(body["content"], "Patched");
    assert_eq!(body["image"], "https://cdn.example.com/p.png");

    let (status, body) =
        common::call(&app, Method::DELETE, "/api/posts/mine/", None, Some(&author)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) =
        common::call(&app, Method::GET, "/api/posts/mine/", None, Some(&author)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["debugMessage"], "No Post matches the given query.");
}

#[tokio::test]
async fn test_like_is_idempotent_and_share_counts_every_time() {
    let app = common::setup_test_app().await;
    let (_, access, _) = common::create_verified_user(&app).await;
    let post = create_post(&app, &access, "Popular", "body").await;
    let id = post["id"].as_i64().unwrap();

    for _ in 0..2 {
        let (status, body) = common::call(
            &app,
            Method::POST,
            &format!("/api/posts/{id}/like/"),
            None,
            Some(&access),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "liked");

        let (status, body) = common::call(
            &app,
            Method::POST,
            &format!("/api/posts/{id}/share/"),
            None,
            Some(&access),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "shared");
    }

    let (_, body) =
        common::call(&app, Method::GET, "/api/posts/popular/", None, Some(&access)).await;
    assert_eq!(body["likes_count"], 1);
    assert_eq!(body["shares_count"], 2);

    let (status, _) =
        common::call(&app, Method::POST, "/api/posts/9999/like/", None, Some(&access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) =
        common::call(&app, Method::POST, "/api/posts/abc/share/", None, Some(&access)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments() {
    let app = common::setup_test_app().await;
    let (username, access, _) = common::create_verified_user(&app).await;
    let post = create_post(&app, &access, "Discuss", "body").await;
    let id = post["id"].as_i64().unwrap();
    let uri = format!("/api/posts/{id}/comments/");

    for text in ["first!", "second"] {
        let (status, body) = common::call(
            &app,
            Method::POST,
            &uri,
            Some(json!({"text": text})),
            Some(&access),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"], username);
        assert_eq!(body["text"], text);
    }

    let (status, body) = common::call(&app, Method::GET, &uri, None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["text"], "second");

    let (status, _) = common::call(
        &app,
        Method::POST,
        &uri,
        Some(json!({"text": "   "})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/posts/9999/comments/",
        Some(json!({"text": "hello?"})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unknown posts just have no comments.
    let (status, body) = common::call(
        &app,
        Method::GET,
        "/api/posts/9999/comments/",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (_, body) =
        common::call(&app, Method::GET, "/api/posts/discuss/", None, Some(&access)).await;
    assert_eq!(body["comments_count"], 2);
}

#[tokio::test]
async fn test_search_posts() {
    let app = common::setup_test_app().await;
    let (_, access, _) = common::create_verified_user(&app).await;
    create_post(&app, &access, "Rust tips", "Ownership explained").await;
    create_post(&app, &access, "Cooking", "How to make RUST-coloured soup").await;
    create_post(&app, &access, "Gardening", "100% organic").await;

    let (status, body) = common::call(
        &app,
        Method::GET,
        "/api/posts/search/?q=rust",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    // Wildcards are matched literally.
    let (_, body) = common::call(
        &app,
        Method::GET,
        "/api/posts/search/?q=%25",
        None,
        Some(&access),
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Gardening");

    let (_, body) =
        common::call(&app, Method::GET, "/api/posts/search/", None, Some(&access)).await;
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_user_posts() {
    let app = common::setup_test_app().await;
    let (alice, alice_access, _) = common::create_verified_user(&app).await;
    let (_, bob_access, _) = common::create_verified_user(&app).await;
    create_post(&app, &alice_access, "Alice one", "body").await;
    create_post(&app, &bob_access, "Bob one", "body").await;

    let (status, body) = common::call(
        &app,
        Method::GET,
        &format!("/api/posts/user/{alice}/"),
        None,
        Some(&bob_access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["author"], alice);

    let (status, _) = common::call(
        &app,
        Method::GET,
        "/api/posts/user/nobody-here/",
        None,
        Some(&bob_access),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
