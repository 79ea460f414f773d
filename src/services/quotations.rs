use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    config::AppConfig,
    entities::{
        job_order, quotation, quotation_item, JobOrder, Profile, ProfileRole, Quotation,
        QuotationItem, QuotationStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        document_numbers::{DocumentKind, DocumentNumberService},
        status_transitions::{quotation_is_deletable, quotation_transition},
        validate_non_negative, PageParams,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuotationItemInput {
    #[validate(length(min = 1, max = 200))]
    pub parameter: String,
    #[validate(length(max = 100))]
    pub sample_type: Option<String>,
    #[validate(length(max = 200))]
    pub regulation: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "250000")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateQuotationInput {
    pub client_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1), custom = "validate_items")]
    pub items: Vec<QuotationItemInput>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub perdiem_price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub perdiem_quantity: i32,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub transport_price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub transport_quantity: i32,
    /// Fraction between 0 and 1; the configured default applies when absent
    #[validate(custom = "validate_tax_rate")]
    #[schema(value_type = Option<String>, example = "0.11")]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub discount_amount: Decimal,
    pub valid_until: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn validate_items(items: &[QuotationItemInput]) -> Result<(), validator::ValidationError> {
    for item in items {
        if item.validate().is_err() {
            let mut err = validator::ValidationError::new("items");
            err.message = Some(format!("invalid item '{}'", item.parameter).into());
            return Err(err);
        }
    }
    Ok(())
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), validator::ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::ONE {
        let mut err = validator::ValidationError::new("tax_rate");
        err.message = Some("must be between 0 and 1".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateQuotationStatusInput {
    pub status: QuotationStatus,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuotationFilter {
    pub status: Option<QuotationStatus>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuotationWithItems {
    pub quotation: quotation::Model,
    pub items: Vec<quotation_item::Model>,
}

/// Money fields derived from the line items and surcharges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotationTotals {
    pub items_total: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

fn amount_too_large() -> ServiceError {
    ServiceError::ValidationError("amount too large".to_string())
}

pub fn line_total(quantity: i32, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .ok_or_else(amount_too_large)
}

/// `subtotal = items + per-diem + transport`, tax applies after the discount
pub fn compute_totals(
    items: &[QuotationItemInput],
    perdiem: (Decimal, i32),
    transport: (Decimal, i32),
    discount_amount: Decimal,
    tax_rate: Decimal,
) -> Result<QuotationTotals, ServiceError> {
    let mut items_total = Decimal::ZERO;
    for item in items {
        items_total = items_total
            .checked_add(line_total(item.quantity, item.unit_price)?)
            .ok_or_else(amount_too_large)?;
    }
    let perdiem_total = line_total(perdiem.1, perdiem.0)?;
    let transport_total = line_total(transport.1, transport.0)?;
    let subtotal = items_total
        .checked_add(perdiem_total)
        .and_then(|sum| sum.checked_add(transport_total))
        .ok_or_else(amount_too_large)?;

    if discount_amount > subtotal {
        return Err(ServiceError::ValidationError(format!(
            "discount {} exceeds subtotal {}",
            discount_amount, subtotal
        )));
    }

    let taxable = subtotal - discount_amount;
    let tax_amount = taxable
        .checked_mul(tax_rate)
        .ok_or_else(amount_too_large)?
        .round_dp(2);
    let total_amount = taxable
        .checked_add(tax_amount)
        .ok_or_else(amount_too_large)?;

    Ok(QuotationTotals {
        items_total,
        subtotal,
        discount_amount,
        tax_rate,
        tax_amount,
        total_amount,
    })
}

#[derive(Clone)]
pub struct QuotationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    numbers: DocumentNumberService,
}

impl QuotationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        let numbers = DocumentNumberService::from_config(&config);
        Self {
            db,
            event_sender,
            config,
            numbers,
        }
    }

    fn default_tax_rate(&self) -> Result<Decimal, ServiceError> {
        Decimal::try_from(self.config.default_tax_rate)
            .map(|rate| rate.round_dp(4))
            .map_err(|e| ServiceError::InternalError(format!("invalid default tax rate: {}", e)))
    }

    /// Creates a draft quotation with its items and a fresh `QUO/` number.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: CreateQuotationInput,
    ) -> Result<QuotationWithItems, ServiceError> {
        input.validate()?;

        let tax_rate = match input.tax_rate {
            Some(rate) => rate,
            None => self.default_tax_rate()?,
        };
        let totals = compute_totals(
            &input.items,
            (input.perdiem_price, input.perdiem_quantity),
            (input.transport_price, input.transport_quantity),
            input.discount_amount,
            tax_rate,
        )?;

        let txn = self.db.begin().await?;

        let client = Profile::find_by_id(input.client_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("client {} not found", input.client_id))
            })?;
        if client.role != ProfileRole::Client {
            return Err(ServiceError::ValidationError(format!(
                "profile {} is not a client",
                client.id
            )));
        }

        let now = Utc::now();
        let number = self
            .numbers
            .next_number(&txn, DocumentKind::Quotation, now)
            .await?;

        let quotation_id = Uuid::new_v4();
        let quotation = quotation::ActiveModel {
            id: Set(quotation_id),
            quotation_number: Set(number.clone()),
            client_id: Set(client.id),
            title: Set(input.title.trim().to_string()),
            status: Set(QuotationStatus::Draft),
            perdiem_price: Set(input.perdiem_price),
            perdiem_quantity: Set(input.perdiem_quantity),
            transport_price: Set(input.transport_price),
            transport_quantity: Set(input.transport_quantity),
            subtotal: Set(totals.subtotal),
            tax_rate: Set(totals.tax_rate),
            tax_amount: Set(totals.tax_amount),
            discount_amount: Set(totals.discount_amount),
            total_amount: Set(totals.total_amount),
            valid_until: Set(input.valid_until),
            notes: Set(input.notes),
            created_by: Set(Some(actor.profile_id)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("quotation number {} is taken", number)))?;

        let mut items = Vec::with_capacity(input.items.len());
        for (position, item) in input.items.into_iter().enumerate() {
            let saved = quotation_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                quotation_id: Set(quotation_id),
                position: Set(position as i32 + 1),
                parameter: Set(item.parameter.trim().to_string()),
                sample_type: Set(item.sample_type),
                regulation: Set(item.regulation),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(line_total(item.quantity, item.unit_price)?),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(saved);
        }

        txn.commit().await?;

        counter!("labdesk.quotations.created", 1);
        self.event_sender
            .send_or_log(Event::QuotationCreated {
                quotation_id,
                quotation_number: number.clone(),
            })
            .await;

        info!(quotation_id = %quotation_id, number = %number, "created quotation");
        Ok(QuotationWithItems { quotation, items })
    }

    async fn find_visible(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<quotation::Model, ServiceError> {
        let quotation = Quotation::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quotation {} not found", id)))?;

        if actor.has_role(ProfileRole::Client) && quotation.client_id != actor.profile_id {
            return Err(ServiceError::Forbidden(
                "quotation belongs to another client".to_string(),
            ));
        }
        Ok(quotation)
    }

    pub async fn get(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<QuotationWithItems, ServiceError> {
        let quotation = self.find_visible(actor, id).await?;
        let items = quotation
            .find_related(QuotationItem)
            .order_by_asc(quotation_item::Column::Position)
            .all(&*self.db)
            .await?;
        Ok(QuotationWithItems { quotation, items })
    }

    /// Clients only ever see their own quotations
    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        filter: QuotationFilter,
        page: PageParams,
    ) -> Result<(Vec<quotation::Model>, u64), ServiceError> {
        let (page, per_page) = page.normalized();

        let client_id = if actor.has_role(ProfileRole::Client) {
            Some(actor.profile_id)
        } else {
            filter.client_id
        };

        let mut query = Quotation::find();
        if let Some(client_id) = client_id {
            query = query.filter(quotation::Column::ClientId.eq(client_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(quotation::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(quotation::Column::CreatedAt)
            .order_by_desc(quotation::Column::QuotationNumber)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page - 1).await?;

        Ok((data, total))
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        input: UpdateQuotationStatusInput,
    ) -> Result<quotation::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let current = Quotation::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quotation {} not found", id)))?;

        let old_status = current.status;
        let new_status = quotation_transition(old_status, input.status)?;
        if new_status == old_status {
            txn.commit().await?;
            return Ok(current);
        }

        let mut active: quotation::ActiveModel = current.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        counter!("labdesk.quotations.status_changed", 1, "to" => new_status.to_string());
        self.event_sender
            .send_or_log(Event::QuotationStatusChanged {
                quotation_id: id,
                old_status,
                new_status,
            })
            .await;

        info!(quotation_id = %id, from = %old_status, to = %new_status, "quotation status changed");
        Ok(updated)
    }

    /// Only draft and rejected quotations can be deleted; items go with them.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let quotation = Quotation::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("quotation {} not found", id)))?;

        if !quotation_is_deletable(quotation.status) {
            return Err(ServiceError::Conflict(format!(
                "quotation {} is {} and cannot be deleted",
                quotation.quotation_number, quotation.status
            )));
        }

        if JobOrder::find()
            .filter(job_order::Column::QuotationId.eq(id))
            .one(&txn)
            .await?
            .is_some()
        {
            warn!(quotation_id = %id, "refusing to delete quotation with a job order");
            return Err(ServiceError::Conflict(format!(
                "quotation {} has a job order",
                quotation.quotation_number
            )));
        }

        QuotationItem::delete_many()
            .filter(quotation_item::Column::QuotationId.eq(id))
            .exec(&txn)
            .await?;
        Quotation::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::QuotationDeleted { quotation_id: id })
            .await;
        info!(quotation_id = %id, "deleted quotation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn item(quantity: i32, unit_price: Decimal) -> QuotationItemInput {
        QuotationItemInput {
            parameter: "BOD".into(),
            sample_type: Some("wastewater".into()),
            regulation: None,
            quantity,
            unit_price,
        }
    }

    #[test]
    fn totals_include_perdiem_and_transport() {
        let totals = compute_totals(
            &[item(2, dec!(150000)), item(1, dec!(75000))],
            (dec!(200000), 2),
            (dec!(500000), 1),
            dec!(25000),
            dec!(0.11),
        )
        .unwrap();

        assert_eq!(totals.items_total, dec!(375000));
        assert_eq!(totals.subtotal, dec!(1275000));
        assert_eq!(totals.tax_amount, dec!(137500.00));
        assert_eq!(totals.total_amount, dec!(1387500.00));
    }

    #[test]
    fn tax_is_rounded_to_cents() {
        let totals = compute_totals(
            &[item(1, dec!(10.05))],
            (Decimal::ZERO, 0),
            (Decimal::ZERO, 0),
            Decimal::ZERO,
            dec!(0.11),
        )
        .unwrap();
        assert_eq!(totals.tax_amount, dec!(1.11));
        assert_eq!(totals.total_amount, dec!(11.16));
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let err = compute_totals(
            &[item(1, dec!(100))],
            (Decimal::ZERO, 0),
            (Decimal::ZERO, 0),
            dec!(100.01),
            dec!(0.11),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn overflowing_amounts_are_rejected() {
        let huge = Decimal::from_str("79228162514264337593543950").unwrap();
        let err = compute_totals(
            &[item(2000, huge)],
            (Decimal::ZERO, 0),
            (Decimal::ZERO, 0),
            Decimal::ZERO,
            dec!(0.11),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(ref msg) if msg == "amount too large"));

        let err = compute_totals(
            &[item(1, Decimal::MAX), item(1, Decimal::MAX)],
            (Decimal::ZERO, 0),
            (Decimal::ZERO, 0),
            Decimal::ZERO,
            dec!(0.11),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn input_validation_catches_bad_items_and_rates() {
        let mut input = CreateQuotationInput {
            client_id: Uuid::new_v4(),
            title: "Ambient air monitoring".into(),
            items: vec![item(1, dec!(100))],
            perdiem_price: Decimal::ZERO,
            perdiem_quantity: 0,
            transport_price: Decimal::ZERO,
            transport_quantity: 0,
            tax_rate: Some(dec!(0.11)),
            discount_amount: Decimal::ZERO,
            valid_until: None,
            notes: None,
        };
        assert!(input.validate().is_ok());

        input.tax_rate = Some(dec!(1.5));
        assert!(input.validate().is_err());

        input.tax_rate = None;
        input.items = vec![item(0, dec!(100))];
        assert!(input.validate().is_err());

        input.items = vec![];
        assert!(input.validate().is_err());
    }
}
