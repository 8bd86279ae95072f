use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    StateConflict(String),

    #[error("No active subscribers found")]
    NoRecipients,

    #[error("Email transport error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NewsletterResult<T> = Result<T, NewsletterError>;

impl NewsletterError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn admin_required() -> Self {
        Self::Unauthorized("Admin access required".to_string())
    }
}

impl From<sea_orm::DbErr> for NewsletterError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<NewsletterError> for AppError {
    fn from(err: NewsletterError) -> Self {
        match err {
            NewsletterError::Validation(msg) => AppError::BadRequest(msg),
            NewsletterError::Unauthorized(msg) => AppError::Unauthorized(msg),
            NewsletterError::NotFound { entity, .. } => {
                AppError::NotFound(format!("{} not found", entity))
            }
            NewsletterError::StateConflict(msg) => AppError::StateConflict(msg),
            err @ NewsletterError::NoRecipients => AppError::PreconditionFailed(err.to_string()),
            NewsletterError::Transport(msg) => {
                AppError::BadGateway(format!("Failed to send email: {}", msg))
            }
            NewsletterError::Database(msg) | NewsletterError::Internal(msg) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}

impl IntoResponse for NewsletterError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
