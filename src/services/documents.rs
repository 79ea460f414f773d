//! Data objects handed to the PDF renderer.
//!
//! Nothing here lays anything out; the mapping functions only flatten the
//! entities into the fields a quotation or travel order template prints.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait, ModelTrait, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::{
        job_order, profile, quotation, quotation_item, sampling_assignment, travel_order,
        JobOrder, Profile, ProfileRole, Quotation, QuotationItem, SamplingAssignment, TravelOrder,
    },
    errors::ServiceError,
    services::{ensure_assignment_access, quotations::line_total},
};

pub const DOCUMENT_DATE_FORMAT: &str = "%d %B %Y";

pub fn format_document_date(date: NaiveDate) -> String {
    date.format(DOCUMENT_DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuotationRow {
    pub no: u32,
    pub parameter: String,
    pub sample_type: Option<String>,
    pub regulation: Option<String>,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

/// Per-diem or transport surcharge line
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChargeRow {
    pub label: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuotationDocument {
    pub quotation_number: String,
    pub title: String,
    pub status: String,
    pub issue_date: String,
    pub valid_until: Option<String>,
    pub client_name: String,
    pub client_company: Option<String>,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub rows: Vec<QuotationRow>,
    pub perdiem: Option<ChargeRow>,
    pub transport: Option<ChargeRow>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    /// Tax rate as a percentage, e.g. `11`
    #[schema(value_type = String)]
    pub tax_rate_percent: Decimal,
    #[schema(value_type = String)]
    pub tax_amount: Decimal,
    #[schema(value_type = String)]
    pub discount_amount: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BudgetRow {
    pub label: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TravelOrderDocument {
    pub document_number: String,
    pub issue_date: String,
    pub officer_name: String,
    pub officer_phone: Option<String>,
    pub job_number: String,
    pub quotation_number: String,
    pub client_company: Option<String>,
    pub destination: String,
    pub purpose: String,
    pub departure_date: String,
    pub return_date: String,
    pub duration_days: i64,
    pub budget_rows: Vec<BudgetRow>,
    #[schema(value_type = String)]
    pub total_budget: Decimal,
    pub notes: Option<String>,
}

fn charge_row(label: &str, quantity: i32, unit_price: Decimal) -> Option<ChargeRow> {
    if quantity <= 0 || unit_price.is_zero() {
        return None;
    }
    Some(ChargeRow {
        label: label.to_string(),
        quantity,
        unit_price,
        total_price: line_total(quantity, unit_price).ok()?,
    })
}

pub fn map_quotation_document(
    quotation: &quotation::Model,
    items: &[quotation_item::Model],
    client: &profile::Model,
) -> QuotationDocument {
    let mut ordered: Vec<&quotation_item::Model> = items.iter().collect();
    ordered.sort_by_key(|item| item.position);

    let rows = ordered
        .into_iter()
        .enumerate()
        .map(|(idx, item)| QuotationRow {
            no: idx as u32 + 1,
            parameter: item.parameter.clone(),
            sample_type: item.sample_type.clone(),
            regulation: item.regulation.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        })
        .collect();

    QuotationDocument {
        quotation_number: quotation.quotation_number.clone(),
        title: quotation.title.clone(),
        status: quotation.status.to_string(),
        issue_date: format_document_date(quotation.created_at.date_naive()),
        valid_until: quotation.valid_until.map(format_document_date),
        client_name: client.full_name.clone(),
        client_company: client.company_name.clone(),
        client_email: client.email.clone(),
        client_phone: client.phone.clone(),
        rows,
        perdiem: charge_row(
            "Per diem",
            quotation.perdiem_quantity,
            quotation.perdiem_price,
        ),
        transport: charge_row(
            "Transport",
            quotation.transport_quantity,
            quotation.transport_price,
        ),
        subtotal: quotation.subtotal,
        tax_rate_percent: (quotation.tax_rate * Decimal::ONE_HUNDRED).normalize(),
        tax_amount: quotation.tax_amount,
        discount_amount: quotation.discount_amount,
        total_amount: quotation.total_amount,
        notes: quotation.notes.clone(),
    }
}

/// Calendar days covered by a trip, counting both ends
pub fn trip_duration_days(departure: NaiveDate, return_date: NaiveDate) -> i64 {
    (return_date - departure).num_days() + 1
}

pub fn map_travel_order_document(
    order: &travel_order::Model,
    officer: &profile::Model,
    job: &job_order::Model,
    quotation: &quotation::Model,
    client: Option<&profile::Model>,
) -> TravelOrderDocument {
    let budget_rows = [
        ("Transport", order.transport_budget),
        ("Accommodation", order.accommodation_budget),
        ("Daily allowance", order.daily_allowance),
        ("Other", order.other_budget),
    ]
    .into_iter()
    .map(|(label, amount)| BudgetRow {
        label: label.to_string(),
        amount,
    })
    .collect();

    TravelOrderDocument {
        document_number: order.document_number.clone(),
        issue_date: format_document_date(order.created_at.date_naive()),
        officer_name: officer.full_name.clone(),
        officer_phone: officer.phone.clone(),
        job_number: job.job_number.clone(),
        quotation_number: quotation.quotation_number.clone(),
        client_company: client.map(|c| {
            c.company_name
                .clone()
                .unwrap_or_else(|| c.full_name.clone())
        }),
        destination: order.destination.clone(),
        purpose: order.purpose.clone(),
        departure_date: format_document_date(order.departure_date),
        return_date: format_document_date(order.return_date),
        duration_days: trip_duration_days(order.departure_date, order.return_date),
        budget_rows,
        total_budget: order.total_budget,
        notes: order.notes.clone(),
    }
}

#[derive(Clone)]
pub struct DocumentService {
    db: Arc<DatabaseConnection>,
}

impl DocumentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, actor))]
    pub async fn quotation_document(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<QuotationDocument, ServiceError> {
        let quotation = Quotation::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quotation {} not found", id)))?;
        if actor.has_role(ProfileRole::Client) && quotation.client_id != actor.profile_id {
            return Err(ServiceError::Forbidden(
                "quotation belongs to another client".to_string(),
            ));
        }

        let items = quotation
            .find_related(QuotationItem)
            .order_by_asc(quotation_item::Column::Position)
            .all(&*self.db)
            .await?;
        let client = Profile::find_by_id(quotation.client_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("client of quotation {} is missing", id))
            })?;

        Ok(map_quotation_document(&quotation, &items, &client))
    }

    #[instrument(skip(self, actor))]
    pub async fn travel_order_document(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<TravelOrderDocument, ServiceError> {
        let missing = |what: &str| {
            ServiceError::InternalError(format!("{} of travel order {} is missing", what, id))
        };

        let order = TravelOrder::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("travel order {} not found", id)))?;
        let assignment: sampling_assignment::Model =
            SamplingAssignment::find_by_id(order.sampling_assignment_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| missing("sampling assignment"))?;
        ensure_assignment_access(actor, assignment.field_officer_id)?;

        let officer = Profile::find_by_id(assignment.field_officer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| missing("field officer"))?;
        let job = JobOrder::find_by_id(assignment.job_order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| missing("job order"))?;
        let quotation = Quotation::find_by_id(job.quotation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| missing("quotation"))?;
        let client = Profile::find_by_id(quotation.client_id)
            .one(&*self.db)
            .await?;

        Ok(map_travel_order_document(
            &order,
            &officer,
            &job,
            &quotation,
            client.as_ref(),
        ))
    }
}
