use axum::extract::State;

use crate::{
    auth::AuthUser, handlers::common::success_response, services::dashboard::DashboardSummary,
    ApiResult, AppState,
};

/// Status overview scoped to the caller's role
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn dashboard(State(state): State<AppState>, user: AuthUser) -> ApiResult<DashboardSummary> {
    let summary = state.services.dashboard.summary(&user).await?;
    Ok(success_response(summary))
}
