use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;
use tracing::error;
use validator::ValidationErrors;

// Application error carried out of services and handlers.
pub struct AppError {
    pub error_type: ErrorType,
    pub error_message: String,
}

#[derive(Debug, Display, derive_more::Error, Clone)]
pub enum ErrorType {
    #[display("Not found")]
    NotFound,
    #[display("Bad request")]
    BadRequest,
    #[display("Internal server error")]
    InternalServerError,
    #[display("Authentication error")]
    UnauthorizedError,
    #[display("Permission denied")]
    Forbidden,
    #[display("Request validation error")]
    RequestValidationError {
        validation_error: ValidationErrors,
        object: String,
    },
}

impl AppError {
    // constructor.
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            error_message: message.into(),
        }
    }

    /// Wraps `validator` failures for the named request object.
    pub fn validation(validation_error: ValidationErrors, object: &str) -> Self {
        Self::new(
            ErrorType::RequestValidationError {
                validation_error,
                object: object.to_string(),
            },
            "Validation error. Check the request body.",
        )
    }

    /// Generic 500 used when the cause has already been logged.
    pub fn internal() -> Self {
        Self::new(
            ErrorType::InternalServerError,
            "Something went wrong. Please try again later.",
        )
    }
}

/// Logs the underlying error with `context` and hides it behind the generic 500.
pub fn internal_error<E: std::fmt::Debug>(context: &'static str) -> impl FnOnce(E) -> AppError {
    move |e| {
        error!("{}: {:?}", context, e);
        AppError::internal()
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.error_message)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "500")]
    pub status: u16,
    #[schema(example = "2024-01-01T12:00:00.000Z")]
    pub time: String,
    #[schema(example = "Internal server error")]
    pub message: String,
    #[serde(rename = "debugMessage")]
    #[schema(example = "Internal server error. Try after some time")]
    pub debug_message: Option<String>,
    #[serde(rename = "subErrors")]
    pub sub_errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationError {
    #[schema(example = "RegisterRequest")]
    pub object: String,
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "notAValidEmail")]
    pub rejected_value: String,
    #[schema(example = "Enter a valid email address.")]
    pub message: String,
    #[schema(example = "email")]
    pub code: String,
}
