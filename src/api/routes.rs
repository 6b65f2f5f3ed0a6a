use crate::api::handler::account_handler::{protected_account_routes, public_account_routes};
use crate::api::handler::health_handler::health_routes;
use crate::api::handler::post_handler::post_routes;
use crate::api::openapi::ApiDoc;
use crate::config::app_config::AppState;
use crate::config::settings::Settings;
use crate::middleware::auth::require_auth;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

const CORS_ALLOWED_HEADERS: [HeaderName; 9] = [
    header::ACCEPT,
    header::ACCEPT_ENCODING,
    header::AUTHORIZATION,
    header::CONTENT_TYPE,
    header::DNT,
    header::ORIGIN,
    header::USER_AGENT,
    HeaderName::from_static("x-csrftoken"),
    HeaderName::from_static("x-requested-with"),
];

/// Any origin in development; only the frontend, with credentials, in production.
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    if !settings.environment.is_production() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(CORS_ALLOWED_HEADERS)
        .allow_credentials(true);
    match HeaderValue::from_str(&settings.frontend_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            error!("FRONTEND_URL is not a valid origin, CORS disabled: {}", e);
            layer
        }
    }
}

/// All routes with state applied, without the outer middleware stack.
pub fn app_router(state: Arc<AppState>) -> Router {
    let auth = axum::middleware::from_fn_with_state(state.clone(), require_auth);

    let account_routes =
        public_account_routes().merge(protected_account_routes().route_layer(auth.clone()));

    Router::new()
        .merge(health_routes())
        .nest("/api/account", account_routes)
        .nest("/api/posts", post_routes().route_layer(auth))
        .route(
            ApiDoc::openapi_json_path(),
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .with_state(state)
}

/// The full application: router, middleware stack and trailing-slash normalisation.
///
/// `NormalizePath` wraps the router from the outside so `/api/posts/` and `/api/posts`
/// hit the same route.
pub fn build_app(state: Arc<AppState>) -> NormalizePath<Router> {
    let timeout = Duration::from_secs(state.settings.request_timeout_secs);
    let cors = cors_layer(&state.settings);

    let router = app_router(state)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    NormalizePath::trim_trailing_slash(router)
}
