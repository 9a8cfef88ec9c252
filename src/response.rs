use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::models::RegistryError;
use crate::services::{AnalysisError, TrainingError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        let message = err.to_string();
        match err {
            AnalysisError::Validation(_) => Self::validation(message),
            AnalysisError::NotFound(_) => Self::not_found(message),
            AnalysisError::Training(TrainingError::UnknownSlot(_)) => Self::bad_request(message),
            AnalysisError::Training(_) => Self::conflict(message),
            AnalysisError::Registry(RegistryError::ModelNotAvailable(_)) => {
                json_error(StatusCode::BAD_REQUEST, "MODEL_NOT_AVAILABLE", message)
            }
            AnalysisError::Registry(RegistryError::SchemaMismatch(_)) => {
                json_error(StatusCode::BAD_REQUEST, "SCHEMA_MISMATCH", message)
            }
            AnalysisError::Registry(RegistryError::MissingTarget(_)) => Self::bad_request(message),
            AnalysisError::Registry(_) | AnalysisError::Store(_) | AnalysisError::Join(_) => {
                tracing::error!(error = %message, "analysis request failed");
                Self::internal(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "Internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelSlot;
    use crate::services::ValidationError;

    #[test]
    fn test_error_mapping() {
        let err: AppError = AnalysisError::from(ValidationError::EmptyText("question_text")).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err: AppError =
            AnalysisError::from(RegistryError::ModelNotAvailable(ModelSlot::ScorePredictor)).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "MODEL_NOT_AVAILABLE");

        let err: AppError =
            AnalysisError::from(TrainingError::AlreadyInProgress(ModelSlot::ScorePredictor)).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: AppError = AnalysisError::NotFound("Subject not found".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
