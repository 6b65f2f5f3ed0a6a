use crate::api::model::common::Message;
use crate::config::app_config::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{debug, error};

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health_handler))
}

/// Service health
///
/// Runs a trivial query against the database and reports whether it answered.
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are up", body = Message),
        (status = 503, description = "Database unavailable", body = Message),
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let response: Result<(i64,), sqlx::Error> =
        sqlx::query_as("SELECT 1").fetch_one(&state.db_pool).await;
    match response {
        Ok(r) => {
            debug!("DB Response -> {}", r.0);
            (
                StatusCode::OK,
                Json(Message {
                    message: "Welcome to the 5thsocial API".to_string(),
                    status: "Success".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Health check query failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Message {
                    message: "Database unavailable".to_string(),
                    status: "Error".to_string(),
                }),
            )
                .into_response()
        }
    }
}
