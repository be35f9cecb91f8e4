use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database unavailable")]
    DatabaseUnavailable(#[source] sqlx::Error),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Template error")]
    TemplateError(#[from] handlebars::RenderError),

    #[error("Export error")]
    ExportError(#[from] csv::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TemplateError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExportError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseUnavailable(_) => "DATABASE_UNAVAILABLE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::TemplateError(_) => "TEMPLATE_ERROR",
            AppError::ExportError(_) => "EXPORT_ERROR",
        }
    }

    /// What a visitor is allowed to see. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) | AppError::AuthError(msg) | AppError::NotFound(msg) => {
                msg.clone()
            }
            AppError::DatabaseUnavailable(_) => "Database connection failed".to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::TemplateError(_) | AppError::ExportError(_) => {
                "Something went wrong while preparing the page".to_string()
            }
        }
    }

    /// User-correctable failures are expected traffic and only logged at debug.
    pub fn log(&self) {
        match self {
            AppError::ValidationError(msg) | AppError::AuthError(msg) | AppError::NotFound(msg) => {
                debug!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::DatabaseUnavailable(e) => {
                error!(error = ?e, "Database unavailable");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::TemplateError(e) => {
                error!(error = ?e, "Template rendering failed");
            }
            AppError::ExportError(e) => {
                error!(error = ?e, "CSV export failed");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        error_response(self.status_code(), self.code(), self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use tracing::Level;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl<S: tracing::Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn levels_logged_by(err: AppError) -> Vec<Level> {
        let recorder = LevelRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        tracing::subscriber::with_default(subscriber, || err.log());
        let levels = recorder.0.lock().unwrap().clone();
        levels
    }

    #[test]
    fn test_database_failures_log_once_at_error() {
        assert_eq!(
            levels_logged_by(AppError::from(sqlx::Error::RowNotFound)),
            vec![Level::ERROR]
        );
        assert_eq!(
            levels_logged_by(AppError::DatabaseUnavailable(sqlx::Error::PoolTimedOut)),
            vec![Level::ERROR]
        );
        assert_eq!(
            levels_logged_by(AppError::ValidationError("Event is already at capacity.".into())),
            vec![Level::DEBUG]
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AuthError("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_details_are_not_public() {
        let err = AppError::DatabaseError(sqlx::Error::Protocol("relation \"student\" does not exist".into()));
        assert_eq!(err.public_message(), "A database error occurred");

        let err = AppError::DatabaseUnavailable(sqlx::Error::PoolTimedOut);
        assert_eq!(err.public_message(), "Database connection failed");
    }

    #[tokio::test]
    async fn test_into_response_uses_error_envelope() {
        let response = AppError::NotFound("Event not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Event not found");
    }
}
