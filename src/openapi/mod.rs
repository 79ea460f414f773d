use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LabDesk API",
        version = "0.1.0",
        description = r#"
# LabDesk Laboratory Service API

Back office for an environmental testing laboratory. A client request moves
through a fixed chain of documents:

quotation -> job order -> sampling assignment -> travel order

## Features

- **Quotations**: Priced test parameters, per diem, transport, tax and discount
- **Job Orders**: Scheduling work for an accepted quotation
- **Sampling**: Field officer assignments, status updates and photo records
- **Travel Orders**: Trip dates and budgets for a sampling assignment
- **Documents**: Field data for quotation and travel order PDFs
- **Dashboard**: Status counts scoped to the caller's role

## Authentication

Every endpoint under `/api/v1` except `/status` requires a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Tokens are issued with `labdesk-cli token issue --email <address>`.

## Rate Limiting

Create endpoints are rate-limited per caller. Responses carry:
- `X-RateLimit-Limit`: Maximum requests per window
- `X-RateLimit-Remaining`: Remaining requests in current window
- `X-RateLimit-Reset`: Seconds until the window frees a slot

Rejected requests receive `429` with a `Retry-After` header.

## Document Numbers

Quotations, job orders and travel orders are numbered `PREFIX/YYYY/MM/NNNN`
(`QUO`, `JO`, `TO`), with the sequence restarting every month.

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "profiles", description = "Staff, field officer and client profiles"),
        (name = "quotations", description = "Quotation pricing and approval"),
        (name = "job-orders", description = "Job order scheduling and progress"),
        (name = "sampling", description = "Field sampling assignments"),
        (name = "travel-orders", description = "Travel orders for sampling trips"),
        (name = "documents", description = "PDF field data"),
        (name = "dashboard", description = "Role-scoped summaries")
    ),
    paths(
        // Profiles
        crate::handlers::profiles::create_profile,
        crate::handlers::profiles::list_profiles,
        crate::handlers::profiles::get_profile,
        crate::handlers::profiles::me,

        // Quotations
        crate::handlers::quotations::create_quotation,
        crate::handlers::quotations::list_quotations,
        crate::handlers::quotations::get_quotation,
        crate::handlers::quotations::update_quotation_status,
        crate::handlers::quotations::delete_quotation,
        crate::handlers::quotations::quotation_document,

        // Job orders
        crate::handlers::job_orders::create_job_order,
        crate::handlers::job_orders::list_job_orders,
        crate::handlers::job_orders::get_job_order,
        crate::handlers::job_orders::update_job_order_status,
        crate::handlers::job_orders::delete_job_order,

        // Sampling
        crate::handlers::sampling::create_assignment,
        crate::handlers::sampling::list_assignments,
        crate::handlers::sampling::get_assignment,
        crate::handlers::sampling::update_sampling_status,
        crate::handlers::sampling::add_photo,
        crate::handlers::sampling::remove_photo,
        crate::handlers::sampling::get_assignment_travel_order,
        crate::handlers::sampling::delete_assignment,

        // Travel orders
        crate::handlers::travel_orders::create_travel_order,
        crate::handlers::travel_orders::list_travel_orders,
        crate::handlers::travel_orders::get_travel_order,
        crate::handlers::travel_orders::travel_order_document,
        crate::handlers::travel_orders::delete_travel_order,

        crate::handlers::dashboard::dashboard,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::errors::ErrorResponse,

            // Records
            crate::entities::profile::Model,
            crate::entities::ProfileRole,
            crate::entities::quotation::Model,
            crate::entities::QuotationStatus,
            crate::entities::quotation_item::Model,
            crate::entities::job_order::Model,
            crate::entities::JobOrderStatus,
            crate::entities::sampling_assignment::Model,
            crate::entities::SamplingStatus,
            crate::entities::PhotoRef,
            crate::entities::travel_order::Model,

            // Requests
            crate::services::profiles::CreateProfileInput,
            crate::services::quotations::CreateQuotationInput,
            crate::services::quotations::QuotationItemInput,
            crate::services::quotations::UpdateQuotationStatusInput,
            crate::services::job_orders::CreateJobOrderInput,
            crate::services::job_orders::UpdateJobOrderStatusInput,
            crate::services::sampling::CreateSamplingAssignmentInput,
            crate::services::sampling::UpdateSamplingStatusInput,
            crate::services::sampling::AddPhotoInput,
            crate::services::travel_orders::CreateTravelOrderInput,

            // Composite responses
            crate::services::quotations::QuotationWithItems,
            crate::services::job_orders::JobOrderDetail,
            crate::services::job_orders::JobOrderStatusUpdate,
            crate::services::sampling::SamplingStatusUpdate,
            crate::services::dashboard::DashboardSummary,

            // Documents
            crate::services::documents::QuotationDocument,
            crate::services::documents::QuotationRow,
            crate::services::documents::ChargeRow,
            crate::services::documents::TravelOrderDocument,
            crate::services::documents::BudgetRow,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_workflow_paths_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("LabDesk API"));
        assert!(json.contains("/api/v1/quotations"));
        assert!(json.contains("/api/v1/sampling-assignments/{id}/photos/{name}"));
        assert!(json.contains("/api/v1/travel-orders/{id}/document"));
        assert!(json.contains("bearer_auth"));
    }
}
