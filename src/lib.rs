//! LabDesk API Library
//!
//! Back office for a testing laboratory: quotations, job orders, field
//! sampling assignments, travel orders and the data behind their PDFs.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod rate_limiter;
pub mod services;
pub mod tracing;

use axum::{
    extract::{Request, State},
    middleware::{from_fn, from_fn_with_state, Next},
    response::{Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{permissions as perm, AuthConfig, AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::middleware_helpers::request_id_middleware;
use crate::rate_limiter::{rate_limit_middleware, RateLimitConfig, RateLimiter};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), config.clone());
        let auth = Arc::new(AuthService::new(AuthConfig::from_app_config(&config)));
        let rate_limiter = RateLimiter::new(RateLimitConfig::from(config.as_ref()));

        Self {
            db,
            config,
            event_sender,
            services,
            auth,
            rate_limiter,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);

        let empty = PaginatedResponse::<u8>::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API routes, each group gated by its permission.
///
/// Create endpoints additionally pass through the rate limiter; the limiter
/// layer sits inside the auth layer so it can key on the caller.
pub fn api_v1_routes(limiter: RateLimiter) -> Router<AppState> {
    // Profiles
    let profiles_read = Router::new()
        .route("/profiles", get(handlers::profiles::list_profiles))
        .route("/profiles/:id", get(handlers::profiles::get_profile))
        .with_permission(perm::PROFILES_READ);

    let profiles_create = Router::new()
        .route("/profiles", post(handlers::profiles::create_profile))
        .layer(from_fn_with_state(limiter.clone(), rate_limit_middleware))
        .with_permission(perm::PROFILES_CREATE);

    let profiles_me = Router::new()
        .route("/profiles/me", get(handlers::profiles::me))
        .with_auth();

    // Quotations
    let quotations_read = Router::new()
        .route("/quotations", get(handlers::quotations::list_quotations))
        .route("/quotations/:id", get(handlers::quotations::get_quotation))
        .route(
            "/quotations/:id/document",
            get(handlers::quotations::quotation_document),
        )
        .with_permission(perm::QUOTATIONS_READ);

    let quotations_create = Router::new()
        .route("/quotations", post(handlers::quotations::create_quotation))
        .layer(from_fn_with_state(limiter.clone(), rate_limit_middleware))
        .with_permission(perm::QUOTATIONS_CREATE);

    let quotations_update = Router::new()
        .route(
            "/quotations/:id/status",
            put(handlers::quotations::update_quotation_status),
        )
        .with_permission(perm::QUOTATIONS_UPDATE);

    let quotations_delete = Router::new()
        .route(
            "/quotations/:id",
            delete(handlers::quotations::delete_quotation),
        )
        .with_permission(perm::QUOTATIONS_DELETE);

    // Job orders
    let job_orders_read = Router::new()
        .route("/job-orders", get(handlers::job_orders::list_job_orders))
        .route("/job-orders/:id", get(handlers::job_orders::get_job_order))
        .with_permission(perm::JOB_ORDERS_READ);

    let job_orders_create = Router::new()
        .route("/job-orders", post(handlers::job_orders::create_job_order))
        .layer(from_fn_with_state(limiter.clone(), rate_limit_middleware))
        .with_permission(perm::JOB_ORDERS_CREATE);

    let job_orders_update = Router::new()
        .route(
            "/job-orders/:id/status",
            put(handlers::job_orders::update_job_order_status),
        )
        .with_permission(perm::JOB_ORDERS_UPDATE);

    let job_orders_delete = Router::new()
        .route(
            "/job-orders/:id",
            delete(handlers::job_orders::delete_job_order),
        )
        .with_permission(perm::JOB_ORDERS_DELETE);

    // Sampling assignments
    let sampling_read = Router::new()
        .route(
            "/sampling-assignments",
            get(handlers::sampling::list_assignments),
        )
        .route(
            "/sampling-assignments/:id",
            get(handlers::sampling::get_assignment),
        )
        .with_permission(perm::SAMPLING_READ);

    let sampling_create = Router::new()
        .route(
            "/sampling-assignments",
            post(handlers::sampling::create_assignment),
        )
        .layer(from_fn_with_state(limiter.clone(), rate_limit_middleware))
        .with_permission(perm::SAMPLING_CREATE);

    let sampling_status = Router::new()
        .route(
            "/sampling-assignments/:id/status",
            put(handlers::sampling::update_sampling_status),
        )
        .with_permission(perm::SAMPLING_UPDATE_STATUS);

    let sampling_photos = Router::new()
        .route(
            "/sampling-assignments/:id/photos",
            post(handlers::sampling::add_photo),
        )
        .route(
            "/sampling-assignments/:id/photos/:name",
            delete(handlers::sampling::remove_photo),
        )
        .with_permission(perm::SAMPLING_PHOTOS);

    let sampling_delete = Router::new()
        .route(
            "/sampling-assignments/:id",
            delete(handlers::sampling::delete_assignment),
        )
        .with_permission(perm::SAMPLING_DELETE);

    // Travel orders
    let travel_orders_read = Router::new()
        .route(
            "/travel-orders",
            get(handlers::travel_orders::list_travel_orders),
        )
        .route(
            "/travel-orders/:id",
            get(handlers::travel_orders::get_travel_order),
        )
        .route(
            "/travel-orders/:id/document",
            get(handlers::travel_orders::travel_order_document),
        )
        .route(
            "/sampling-assignments/:id/travel-order",
            get(handlers::sampling::get_assignment_travel_order),
        )
        .with_permission(perm::TRAVEL_ORDERS_READ);

    let travel_orders_create = Router::new()
        .route(
            "/travel-orders",
            post(handlers::travel_orders::create_travel_order),
        )
        .layer(from_fn_with_state(limiter.clone(), rate_limit_middleware))
        .with_permission(perm::TRAVEL_ORDERS_CREATE);

    let travel_orders_delete = Router::new()
        .route(
            "/travel-orders/:id",
            delete(handlers::travel_orders::delete_travel_order),
        )
        .with_permission(perm::TRAVEL_ORDERS_DELETE);

    let dashboard = Router::new()
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .with_permission(perm::DASHBOARD_READ);

    Router::new()
        .route("/status", get(api_status))
        .merge(profiles_read)
        .merge(profiles_create)
        .merge(profiles_me)
        .merge(quotations_read)
        .merge(quotations_create)
        .merge(quotations_update)
        .merge(quotations_delete)
        .merge(job_orders_read)
        .merge(job_orders_create)
        .merge(job_orders_update)
        .merge(job_orders_delete)
        .merge(sampling_read)
        .merge(sampling_create)
        .merge(sampling_status)
        .merge(sampling_photos)
        .merge(sampling_delete)
        .merge(travel_orders_read)
        .merge(travel_orders_create)
        .merge(travel_orders_delete)
        .merge(dashboard)
}

/// Full application router with request ids, tracing and docs attached.
///
/// CORS and compression are left to the binary so tests can drive this
/// router directly.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes(state.rate_limiter.clone()))
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(from_fn_with_state(state.auth.clone(), inject_auth_service))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn inject_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth);
    next.run(request).await
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "labdesk-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
            "rate_limiter_keys": state.rate_limiter.tracked_keys(),
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
