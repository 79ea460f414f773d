use crate::{errors::ServiceError, ApiResponse, PaginatedResponse};
use axum::{http::StatusCode, Json};
use serde::Serialize;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Standard no content response
pub fn no_content_response() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Validate request input before it reaches a service
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Wraps a `(rows, total)` page from a service
pub fn paginated_response<T: Serialize>(
    (items, total): (Vec<T>, u64),
    page: crate::services::PageParams,
) -> Json<ApiResponse<PaginatedResponse<T>>> {
    let (page, per_page) = page.normalized();
    Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}
