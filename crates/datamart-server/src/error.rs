use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use datamart_core::AppError;
use serde::Serialize;
use tracing::{debug, warn};

use crate::routes::AppJson;
use crate::LOG_TARGET;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Any failure a handler can return. Wraps [`AppError`] so it can be turned
/// into a response.
#[derive(Debug)]
pub struct RequestError(pub AppError);

pub type RequestResult<T> = Result<T, RequestError>;

impl From<AppError> for RequestError {
    fn from(source: AppError) -> Self {
        Self(source)
    }
}

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::ValidationError(rejection.body_text()))
    }
}

impl From<PathRejection> for RequestError {
    fn from(rejection: PathRejection) -> Self {
        Self(AppError::ValidationError(rejection.body_text()))
    }
}

impl From<QueryRejection> for RequestError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::ValidationError(rejection.body_text()))
    }
}

pub fn status_code(err: &AppError) -> StatusCode {
    match err {
        AppError::ValidationError(_) | AppError::RowOutOfRange { .. } => StatusCode::BAD_REQUEST,
        AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::UniquenessViolation(_) => StatusCode::CONFLICT,
        AppError::FetchFailed { .. } => StatusCode::BAD_GATEWAY,
        AppError::DatabaseError(_) | AppError::SerializationError(_) | AppError::Generic(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = status_code(&self.0);

        let error = if status.is_server_error() {
            warn!(target: LOG_TARGET, err = %self.0, status = status.as_u16(), "Unexpected request error");
            match self.0 {
                AppError::FetchFailed { .. } => self.0.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            debug!(target: LOG_TARGET, err = %self.0, "Request error");
            self.0.to_string()
        };

        (status, AppJson(ErrorResponse { error })).into_response()
    }
}
