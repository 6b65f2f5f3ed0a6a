use crate::error::error_model::{ApiError, AppError, ErrorType, ValidationError};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::debug;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let span = tracing::Span::current();
        span.record("error", true);
        span.record("error.message", self.error_message.as_str());
        span.record("error.type", self.error_type.to_string().as_str());

        let (status, sub_errors) = match &self.error_type {
            ErrorType::NotFound => (StatusCode::NOT_FOUND, vec![]),
            ErrorType::BadRequest => (StatusCode::BAD_REQUEST, vec![]),
            ErrorType::InternalServerError => (StatusCode::INTERNAL_SERVER_ERROR, vec![]),
            ErrorType::UnauthorizedError => (StatusCode::UNAUTHORIZED, vec![]),
            ErrorType::Forbidden => (StatusCode::FORBIDDEN, vec![]),
            ErrorType::RequestValidationError {
                validation_error,
                object,
            } => {
                let mut validation_sub_errs = Vec::new();
                for (field, field_errors) in validation_error.field_errors() {
                    for field_error in field_errors {
                        debug!("Validation error on field {}: {:?}", field, field_error.code);
                        validation_sub_errs.push(ValidationError {
                            object: object.to_string(),
                            field: field.to_string(),
                            rejected_value: field_error
                                .params
                                .get("value")
                                .map(|v| v.to_string())
                                .unwrap_or_default(),
                            message: field_error
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_default(),
                            code: field_error.code.to_string(),
                        })
                    }
                }
                (StatusCode::UNPROCESSABLE_ENTITY, validation_sub_errs)
            }
        };
        let api_error = ApiError {
            status: status.into(),
            time: Utc::now().to_rfc3339(),
            message: self.error_type.to_string(),
            debug_message: Some(self.error_message),
            sub_errors,
        };

        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                serde_json::to_string(&api_error).unwrap_or_default(),
            ))
            .unwrap_or_else(|_| Response::new(axum::body::Body::empty()))
    }
}
