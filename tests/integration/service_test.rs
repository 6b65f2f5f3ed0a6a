use axum::http::{Method, StatusCode};

mod common {
    pub use crate::helpers::*;
}

#[tokio::test]
async fn test_health() {
    let app = common::setup_test_app().await;

    let (status, body) = common::call(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the 5thsocial API");
    assert_eq!(body["status"], "Success");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = common::setup_test_app().await;

    let response =
        common::make_request(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert!(body["paths"]["/api/posts/"].is_object());

    let response = common::make_request(&app, Method::GET, "/docs", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trailing_slash_is_optional() {
    let app = common::setup_test_app().await;

    for uri in ["/api/account/profile", "/api/account/profile/"] {
        let (status, _) = common::call(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}
