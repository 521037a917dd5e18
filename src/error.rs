use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum SummaryError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Missing required connection details: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Malformed summary payload: {0}")]
    MalformedSummary(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Summary not found: {id}")]
    NotFound { id: String },

    #[error("Operation cancelled before completion")]
    Cancelled,
}

impl SummaryError {
    /// Transient I/O failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SummaryError::Http(_)
                | SummaryError::UpstreamStatus(_)
                | SummaryError::MalformedSummary(_)
                | SummaryError::Database(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SummaryError::InvalidBody(_) | SummaryError::MissingFields(_) => {
                StatusCode::BAD_REQUEST
            }
            SummaryError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SummaryError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match self {
            SummaryError::InvalidBody(_) => ApiErrorBody {
                code: "INVALID_BODY".to_string(),
                message: "Invalid request body".to_string(),
            },
            SummaryError::MissingFields(_) => ApiErrorBody {
                code: "MISSING_FIELDS".to_string(),
                message: self.to_string(),
            },
            SummaryError::NotFound { .. } => ApiErrorBody {
                code: "NOT_FOUND".to_string(),
                message: "Summary not found".to_string(),
            },
            SummaryError::Http(_)
            | SummaryError::UpstreamStatus(_)
            | SummaryError::MalformedSummary(_) => {
                error!(error = %self, "summary fetch failed");
                ApiErrorBody {
                    code: "UPSTREAM_ERROR".to_string(),
                    message: "Failed to fetch summary from upstream service.".to_string(),
                }
            }
            SummaryError::Database(_) => {
                error!(error = %self, "summary store failed");
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                }
            }
            SummaryError::Cancelled => ApiErrorBody {
                code: "CANCELLED".to_string(),
                message: "Summary sync did not complete in time.".to_string(),
            },
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
