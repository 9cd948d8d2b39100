use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use smoke_core::error::CoreError;
use smoke_events::FeedError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`FeedError`] for storage ones.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `smoke_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The verdict feed refused the operation.
    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidRunId(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_RUN_ID", core.to_string())
                }
            },

            // --- Feed errors ---
            AppError::Feed(FeedError::Closed) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "FEED_CLOSED",
                "Verdict feed is shutting down".to_string(),
            ),
            AppError::Feed(FeedError::Unavailable(msg)) => {
                tracing::error!(error = %msg, "Verdict store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "FEED_UNAVAILABLE",
                    "Verdict store is unavailable".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
