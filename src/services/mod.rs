// Workflow rules and numbering
pub mod document_numbers;
pub mod status_transitions;

// Resource services
pub mod job_orders;
pub mod profiles;
pub mod quotations;
pub mod sampling;
pub mod travel_orders;

// Read-side shaping
pub mod dashboard;
pub mod documents;

use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::ValidationError;

use crate::auth::AuthUser;
use crate::errors::ServiceError;

pub use dashboard::DashboardService;
pub use document_numbers::{DocumentKind, DocumentNumberService};
pub use documents::DocumentService;
pub use job_orders::JobOrderService;
pub use profiles::ProfileService;
pub use quotations::QuotationService;
pub use sampling::SamplingService;
pub use travel_orders::TravelOrderService;

pub const MAX_PAGE_SIZE: u64 = 100;

/// Page selection shared by list endpoints
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageParams {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// 1-based page and a page size within `1..=MAX_PAGE_SIZE`
    pub fn normalized(self) -> (u64, u64) {
        (self.page.max(1), self.per_page.clamp(1, MAX_PAGE_SIZE))
    }
}

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => {
            let mut err = ValidationError::new("http_url");
            err.message = Some("must be an http(s) URL".into());
            Err(err)
        }
    }
}

pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Field officers may only touch their own assignments
pub(crate) fn ensure_assignment_access(
    actor: &AuthUser,
    field_officer_id: uuid::Uuid,
) -> Result<(), ServiceError> {
    if actor.is_staff() || actor.profile_id == field_officer_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "assignment belongs to another field officer".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn page_params_are_clamped() {
        assert_eq!(PageParams::new(0, 0).normalized(), (1, 1));
        assert_eq!(PageParams::new(3, 500).normalized(), (3, MAX_PAGE_SIZE));
        assert_eq!(PageParams::default().normalized(), (1, 20));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(validate_non_negative(&dec!(0)).is_ok());
        assert!(validate_non_negative(&dec!(12.50)).is_ok());
        assert!(validate_non_negative(&dec!(-0.01)).is_err());
    }

    #[test]
    fn photo_urls_must_be_http() {
        assert!(validate_http_url("https://cdn.example.com/a.jpg").is_ok());
        assert!(validate_http_url("http://10.0.0.2/p.png").is_ok());
        assert!(validate_http_url("ftp://host/a.jpg").is_err());
        assert!(validate_http_url("https://").is_err());
        assert!(validate_http_url("/local/path.jpg").is_err());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(validate_not_blank("  \t ").is_err());
        assert!(validate_not_blank(" a.jpg ").is_ok());
    }
}
