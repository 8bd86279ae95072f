//! Reusable OpenAPI response types for consistent API documentation.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "code": "INTERNAL_ERROR",
        "status": 500,
        "error": "An internal server error occurred"
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - missing or invalid field",
    content_type = "application/json",
    example = json!({
        "code": "VALIDATION_ERROR",
        "status": 400,
        "error": "Name, subject, and content are required"
    })
)]
pub struct BadRequestValidationResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - operation not allowed in the current state",
    content_type = "application/json",
    example = json!({
        "code": "STATE_CONFLICT",
        "status": 400,
        "error": "Cannot edit sent campaigns"
    })
)]
pub struct StateConflictResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "code": "NOT_FOUND",
        "status": 404,
        "error": "Campaign not found"
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Unauthorized - admin bearer token missing or invalid",
    content_type = "application/json",
    example = json!({
        "code": "UNAUTHORIZED",
        "status": 401,
        "error": "Admin access required"
    })
)]
pub struct UnauthorizedResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Gateway - mail transport failed",
    content_type = "application/json",
    example = json!({
        "code": "UPSTREAM_ERROR",
        "status": 502,
        "error": "Email transport rejected the message"
    })
)]
pub struct BadGatewayResponse(pub ErrorResponse);
