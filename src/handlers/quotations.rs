use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::quotation,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, paginated_response, success_response,
        validate_input,
    },
    services::{
        documents::QuotationDocument,
        quotations::{
            CreateQuotationInput, QuotationFilter, QuotationWithItems, UpdateQuotationStatusInput,
        },
        PageParams,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Create a draft quotation
#[utoipa::path(
    post,
    path = "/api/v1/quotations",
    request_body = CreateQuotationInput,
    responses(
        (status = 201, description = "Quotation created", body = QuotationWithItems),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Client not found", body = crate::errors::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "quotations"
)]
pub async fn create_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateQuotationInput>,
) -> Result<(StatusCode, Json<ApiResponse<QuotationWithItems>>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.quotations.create(&user, payload).await?;
    Ok(created_response(created))
}

/// List quotations; clients only see their own
#[utoipa::path(
    get,
    path = "/api/v1/quotations",
    params(QuotationFilter, PageParams),
    responses(
        (status = 200, description = "Quotations page"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "quotations"
)]
pub async fn list_quotations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<QuotationFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<PaginatedResponse<quotation::Model>> {
    let result = state.services.quotations.list(&user, filter, page).await?;
    Ok(paginated_response(result, page))
}

/// Get a quotation with its items
#[utoipa::path(
    get,
    path = "/api/v1/quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "Quotation", body = QuotationWithItems),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "quotations"
)]
pub async fn get_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<QuotationWithItems> {
    let quotation = state.services.quotations.get(&user, id).await?;
    Ok(success_response(quotation))
}

/// Move a quotation through its status machine
#[utoipa::path(
    put,
    path = "/api/v1/quotations/{id}/status",
    params(("id" = Uuid, Path, description = "Quotation id")),
    request_body = UpdateQuotationStatusInput,
    responses(
        (status = 200, description = "Updated quotation", body = quotation::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "quotations"
)]
pub async fn update_quotation_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuotationStatusInput>,
) -> ApiResult<quotation::Model> {
    let updated = state.services.quotations.update_status(id, payload).await?;
    Ok(success_response(updated))
}

/// Delete a draft or rejected quotation
#[utoipa::path(
    delete,
    path = "/api/v1/quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quotation can no longer be deleted", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "quotations"
)]
pub async fn delete_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.quotations.delete(id).await?;
    Ok(no_content_response())
}

/// Field data for the quotation PDF
#[utoipa::path(
    get,
    path = "/api/v1/quotations/{id}/document",
    params(("id" = Uuid, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "Document data", body = QuotationDocument),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn quotation_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<QuotationDocument> {
    let document = state.services.documents.quotation_document(&user, id).await?;
    Ok(success_response(document))
}
