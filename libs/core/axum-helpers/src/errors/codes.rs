//! Machine-readable error codes carried in every error body.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required field is missing or malformed
    ValidationError,
    /// Request body is not valid JSON for the target type
    InvalidJson,
    /// Query string could not be decoded
    InvalidQuery,
    /// The resource exists but its current state forbids the operation
    StateConflict,
    /// A precondition of the operation does not hold
    PreconditionFailed,
    NotFound,
    Unauthorized,
    Forbidden,
    /// An upstream service (mail transport) failed
    UpstreamError,
    DatabaseError,
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidJson => "INVALID_JSON",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::StateConflict => "STATE_CONFLICT",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidJson => "Request body is not valid JSON",
            Self::InvalidQuery => "Query string is invalid",
            Self::StateConflict => "Operation not allowed in the current state",
            Self::PreconditionFailed => "Operation precondition not met",
            Self::NotFound => "Resource not found",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Access forbidden",
            Self::UpstreamError => "Upstream service failed",
            Self::DatabaseError => "A database error occurred",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
