use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use thiserror::Error;
use tracing::error;

use crate::core::http::response_envelope::ApiResponse;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot ---
    #[error("startup failed: {0}")]
    Startup(String),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("endpoint not found")]
    NotFound,

    /// Failures from the study pipeline.
    #[error(transparent)]
    Pipeline(#[from] ContextorError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            // 4xx
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,

            AppError::Pipeline(e) => match e {
                ContextorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ContextorError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ContextorError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ContextorError::AllNamespacesFailed { .. }
                | ContextorError::Generation(_)
                | ContextorError::Rag(_)
                | ContextorError::Llm(_) => StatusCode::BAD_GATEWAY,
            },

            // 5xx, startup-only
            AppError::Startup(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Startup(_) => "STARTUP_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound => "NOT_FOUND",
            AppError::Pipeline(e) => e.code(),
        }
    }

    /// Client-facing message. Server-side failures are described generically
    /// unless `APP_ENV=development`.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_client_error() || expose_details() {
            return self.to_string();
        }
        match self {
            AppError::Pipeline(ContextorError::Unavailable(what)) => format!("{what} is not available"),
            AppError::Pipeline(ContextorError::Timeout(_)) => "The request took too long. Please try again.".into(),
            _ => "An error occurred. Please try again.".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        }
        ApiResponse::<()>::error(self.error_code(), self.public_message(status), Vec::new())
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

fn expose_details() -> bool {
    static DEV: OnceLock<bool> = OnceLock::new();
    *DEV.get_or_init(|| {
        std::env::var("APP_ENV")
            .map(|v| v.trim().eq_ignore_ascii_case("development"))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pipeline_errors_map_to_status_and_code() {
        let e = AppError::from(ContextorError::Unavailable("generator"));
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(e.error_code(), "SERVICE_UNAVAILABLE");

        let e = AppError::from(ContextorError::Timeout(Duration::from_secs(30)));
        assert_eq!(e.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let e = AppError::from(ContextorError::InvalidRequest("query required".into()));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert!(e.public_message(StatusCode::BAD_REQUEST).contains("query required"));
    }

    #[test]
    fn server_errors_hide_internals() {
        let e = AppError::from(ContextorError::AllNamespacesFailed {
            attempted: 2,
            last: "physics: connection refused at 10.0.0.3".into(),
        });
        let msg = e.public_message(StatusCode::BAD_GATEWAY);
        if !expose_details() {
            assert!(!msg.contains("10.0.0.3"));
        }
    }
}
