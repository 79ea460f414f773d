use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::travel_order,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, paginated_response, success_response,
        validate_input,
    },
    services::{documents::TravelOrderDocument, travel_orders::CreateTravelOrderInput, PageParams},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Issue the travel order for a sampling assignment
#[utoipa::path(
    post,
    path = "/api/v1/travel-orders",
    request_body = CreateTravelOrderInput,
    responses(
        (status = 201, description = "Travel order created", body = travel_order::Model),
        (status = 400, description = "Invalid dates or budget", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Assignment already has a travel order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "travel-orders"
)]
pub async fn create_travel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTravelOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<travel_order::Model>>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.travel_orders.create(&user, payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/travel-orders",
    params(PageParams),
    responses((status = 200, description = "Travel orders page")),
    security(("bearer_auth" = [])),
    tag = "travel-orders"
)]
pub async fn list_travel_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageParams>,
) -> ApiResult<PaginatedResponse<travel_order::Model>> {
    let result = state.services.travel_orders.list(&user, page).await?;
    Ok(paginated_response(result, page))
}

#[utoipa::path(
    get,
    path = "/api/v1/travel-orders/{id}",
    params(("id" = Uuid, Path, description = "Travel order id")),
    responses(
        (status = 200, description = "Travel order", body = travel_order::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "travel-orders"
)]
pub async fn get_travel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<travel_order::Model> {
    let order = state.services.travel_orders.get(&user, id).await?;
    Ok(success_response(order))
}

/// Field data for the travel order PDF
#[utoipa::path(
    get,
    path = "/api/v1/travel-orders/{id}/document",
    params(("id" = Uuid, Path, description = "Travel order id")),
    responses(
        (status = 200, description = "Document data", body = TravelOrderDocument),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn travel_order_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<TravelOrderDocument> {
    let document = state
        .services
        .documents
        .travel_order_document(&user, id)
        .await?;
    Ok(success_response(document))
}

#[utoipa::path(
    delete,
    path = "/api/v1/travel-orders/{id}",
    params(("id" = Uuid, Path, description = "Travel order id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "travel-orders"
)]
pub async fn delete_travel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.travel_orders.delete(id).await?;
    Ok(no_content_response())
}
