use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    entities::job_order,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, paginated_response, success_response,
        validate_input,
    },
    services::{
        job_orders::{
            CreateJobOrderInput, JobOrderDetail, JobOrderFilter, JobOrderStatusUpdate,
            UpdateJobOrderStatusInput,
        },
        PageParams,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Open a job order for an accepted or paid quotation
#[utoipa::path(
    post,
    path = "/api/v1/job-orders",
    request_body = CreateJobOrderInput,
    responses(
        (status = 201, description = "Job order created", body = job_order::Model),
        (status = 400, description = "Quotation not accepted", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quotation already has a job order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "job-orders"
)]
pub async fn create_job_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateJobOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<job_order::Model>>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.job_orders.create(payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/job-orders",
    params(JobOrderFilter, PageParams),
    responses((status = 200, description = "Job orders page")),
    security(("bearer_auth" = [])),
    tag = "job-orders"
)]
pub async fn list_job_orders(
    State(state): State<AppState>,
    Query(filter): Query<JobOrderFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<PaginatedResponse<job_order::Model>> {
    let result = state.services.job_orders.list(filter, page).await?;
    Ok(paginated_response(result, page))
}

/// Job order with its quotation and sampling assignment
#[utoipa::path(
    get,
    path = "/api/v1/job-orders/{id}",
    params(("id" = Uuid, Path, description = "Job order id")),
    responses(
        (status = 200, description = "Job order", body = JobOrderDetail),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "job-orders"
)]
pub async fn get_job_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<JobOrderDetail> {
    let detail = state.services.job_orders.get_detail(id).await?;
    Ok(success_response(detail))
}

/// Advance a job order one stage
#[utoipa::path(
    put,
    path = "/api/v1/job-orders/{id}/status",
    params(("id" = Uuid, Path, description = "Job order id")),
    request_body = UpdateJobOrderStatusInput,
    responses(
        (status = 200, description = "Updated job order", body = JobOrderStatusUpdate),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "job-orders"
)]
pub async fn update_job_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobOrderStatusInput>,
) -> ApiResult<JobOrderStatusUpdate> {
    validate_input(&payload)?;
    let updated = state.services.job_orders.update_status(id, payload).await?;
    Ok(success_response(updated))
}

/// Delete a job order with its assignment and travel order
#[utoipa::path(
    delete,
    path = "/api/v1/job-orders/{id}",
    params(("id" = Uuid, Path, description = "Job order id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "job-orders"
)]
pub async fn delete_job_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.job_orders.delete(id).await?;
    Ok(no_content_response())
}
