use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::{sampling_assignment, travel_order},
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, paginated_response, success_response,
        validate_input,
    },
    services::{
        sampling::{
            AddPhotoInput, CreateSamplingAssignmentInput, SamplingFilter, SamplingStatusUpdate,
            UpdateSamplingStatusInput,
        },
        PageParams,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Assign a field officer to a job order; the job order moves to sampling
#[utoipa::path(
    post,
    path = "/api/v1/sampling-assignments",
    request_body = CreateSamplingAssignmentInput,
    responses(
        (status = 201, description = "Assignment created", body = SamplingStatusUpdate),
        (status = 404, description = "Job order or officer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Job order already assigned", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sampling"
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    Json(payload): Json<CreateSamplingAssignmentInput>,
) -> Result<(StatusCode, Json<ApiResponse<SamplingStatusUpdate>>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.sampling.create_assignment(payload).await?;
    Ok(created_response(created))
}

/// List assignments; field officers only see their own
#[utoipa::path(
    get,
    path = "/api/v1/sampling-assignments",
    params(SamplingFilter, PageParams),
    responses((status = 200, description = "Assignments page")),
    security(("bearer_auth" = [])),
    tag = "sampling"
)]
pub async fn list_assignments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<SamplingFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<PaginatedResponse<sampling_assignment::Model>> {
    let result = state.services.sampling.list(&user, filter, page).await?;
    Ok(paginated_response(result, page))
}

#[utoipa::path(
    get,
    path = "/api/v1/sampling-assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment", body = sampling_assignment::Model),
        (status = 403, description = "Assigned to another officer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sampling"
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<sampling_assignment::Model> {
    let assignment = state.services.sampling.get(&user, id).await?;
    Ok(success_response(assignment))
}

/// Change sampling status and mirror it onto the job order
#[utoipa::path(
    put,
    path = "/api/v1/sampling-assignments/{id}/status",
    params(("id" = Uuid, Path, description = "Assignment id")),
    request_body = UpdateSamplingStatusInput,
    responses(
        (status = 200, description = "Assignment and job order after the change", body = SamplingStatusUpdate),
        (status = 403, description = "Assigned to another officer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sampling"
)]
pub async fn update_sampling_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSamplingStatusInput>,
) -> ApiResult<SamplingStatusUpdate> {
    validate_input(&payload)?;
    let updated = state
        .services
        .sampling
        .update_status(&user, id, payload)
        .await?;
    Ok(success_response(updated))
}

/// Attach photo metadata to an assignment
#[utoipa::path(
    post,
    path = "/api/v1/sampling-assignments/{id}/photos",
    params(("id" = Uuid, Path, description = "Assignment id")),
    request_body = AddPhotoInput,
    responses(
        (status = 201, description = "Photo recorded", body = sampling_assignment::Model),
        (status = 400, description = "Invalid URL", body = crate::errors::ErrorResponse),
        (status = 409, description = "Photo name already used", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sampling"
)]
pub async fn add_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddPhotoInput>,
) -> Result<(StatusCode, Json<ApiResponse<sampling_assignment::Model>>), ServiceError> {
    validate_input(&payload)?;
    let updated = state.services.sampling.add_photo(&user, id, payload).await?;
    Ok(created_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sampling-assignments/{id}/photos/{name}",
    params(
        ("id" = Uuid, Path, description = "Assignment id"),
        ("name" = String, Path, description = "Photo name")
    ),
    responses(
        (status = 200, description = "Photo removed", body = sampling_assignment::Model),
        (status = 404, description = "Photo not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sampling"
)]
pub async fn remove_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, name)): Path<(Uuid, String)>,
) -> ApiResult<sampling_assignment::Model> {
    let updated = state
        .services
        .sampling
        .remove_photo(&user, id, &name)
        .await?;
    Ok(success_response(updated))
}

/// Travel order issued for an assignment
#[utoipa::path(
    get,
    path = "/api/v1/sampling-assignments/{id}/travel-order",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Travel order", body = travel_order::Model),
        (status = 404, description = "No travel order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "travel-orders"
)]
pub async fn get_assignment_travel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<travel_order::Model> {
    let order = state
        .services
        .travel_orders
        .get_by_assignment(&user, id)
        .await?;
    Ok(success_response(order))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sampling-assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sampling"
)]
pub async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.sampling.delete(id).await?;
    Ok(no_content_response())
}
