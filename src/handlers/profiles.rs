use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::profile,
    errors::ServiceError,
    handlers::common::{created_response, paginated_response, success_response, validate_input},
    services::{
        profiles::{CreateProfileInput, ProfileFilter},
        PageParams,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Register a staff member, field officer or client
#[utoipa::path(
    post,
    path = "/api/v1/profiles",
    request_body = CreateProfileInput,
    responses(
        (status = 201, description = "Profile created", body = profile::Model),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    Json(payload): Json<CreateProfileInput>,
) -> Result<(StatusCode, Json<ApiResponse<profile::Model>>), ServiceError> {
    validate_input(&payload)?;
    let created = state.services.profiles.create(payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles",
    params(ProfileFilter, PageParams),
    responses((status = 200, description = "Profiles page")),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(filter): Query<ProfileFilter>,
    Query(page): Query<PageParams>,
) -> ApiResult<PaginatedResponse<profile::Model>> {
    let result = state.services.profiles.list(filter, page).await?;
    Ok(paginated_response(result, page))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    params(("id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile", body = profile::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<profile::Model> {
    let profile = state.services.profiles.get(id).await?;
    Ok(success_response(profile))
}

/// Profile of the calling token
#[utoipa::path(
    get,
    path = "/api/v1/profiles/me",
    responses(
        (status = 200, description = "Own profile", body = profile::Model),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "profiles"
)]
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<profile::Model> {
    let profile = state.services.profiles.me(&user).await?;
    Ok(success_response(profile))
}
