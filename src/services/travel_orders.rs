use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    auth::AuthUser,
    config::AppConfig,
    entities::{
        sampling_assignment, travel_order, SamplingAssignment, SamplingStatus, TravelOrder,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        document_numbers::{DocumentKind, DocumentNumberService},
        ensure_assignment_access, validate_non_negative, PageParams,
    },
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_travel_dates"))]
pub struct CreateTravelOrderInput {
    pub sampling_assignment_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub destination: String,
    #[validate(length(min = 1, max = 1000))]
    pub purpose: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub transport_budget: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub accommodation_budget: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub daily_allowance: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String)]
    pub other_budget: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn validate_travel_dates(input: &CreateTravelOrderInput) -> Result<(), ValidationError> {
    if input.return_date < input.departure_date {
        let mut err = ValidationError::new("return_date");
        err.message = Some("return date must not be before departure".into());
        return Err(err);
    }
    Ok(())
}

impl CreateTravelOrderInput {
    pub fn total_budget(&self) -> Result<Decimal, ServiceError> {
        [
            self.accommodation_budget,
            self.daily_allowance,
            self.other_budget,
        ]
        .into_iter()
        .try_fold(self.transport_budget, |sum, line| sum.checked_add(line))
        .ok_or_else(|| ServiceError::ValidationError("amount too large".to_string()))
    }
}

#[derive(Clone)]
pub struct TravelOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    numbers: DocumentNumberService,
}

impl TravelOrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            numbers: DocumentNumberService::from_config(&config),
        }
    }

    /// Issues the single travel order of an assignment with a fresh `TO/` number.
    #[instrument(skip(self, actor, input), fields(assignment_id = %input.sampling_assignment_id))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        input: CreateTravelOrderInput,
    ) -> Result<travel_order::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let assignment = SamplingAssignment::find_by_id(input.sampling_assignment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "sampling assignment {} not found",
                    input.sampling_assignment_id
                ))
            })?;

        if assignment.status == SamplingStatus::Cancelled {
            return Err(ServiceError::InvalidStatus(format!(
                "sampling assignment {} is cancelled",
                assignment.id
            )));
        }

        if let Some(existing) = TravelOrder::find()
            .filter(travel_order::Column::SamplingAssignmentId.eq(assignment.id))
            .one(&txn)
            .await?
        {
            return Err(ServiceError::Conflict(format!(
                "sampling assignment {} already has travel order {}",
                assignment.id, existing.document_number
            )));
        }

        let now = Utc::now();
        let number = self
            .numbers
            .next_number(&txn, DocumentKind::TravelOrder, now)
            .await?;
        let total_budget = input.total_budget()?;

        let created = travel_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            sampling_assignment_id: Set(assignment.id),
            document_number: Set(number.clone()),
            destination: Set(input.destination.trim().to_string()),
            purpose: Set(input.purpose.trim().to_string()),
            departure_date: Set(input.departure_date),
            return_date: Set(input.return_date),
            transport_budget: Set(input.transport_budget),
            accommodation_budget: Set(input.accommodation_budget),
            daily_allowance: Set(input.daily_allowance),
            other_budget: Set(input.other_budget),
            total_budget: Set(total_budget),
            notes: Set(input.notes),
            created_by: Set(Some(actor.profile_id)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(
                e,
                format!(
                    "sampling assignment {} already has a travel order",
                    assignment.id
                ),
            )
        })?;

        txn.commit().await?;

        counter!("labdesk.travel_orders.created", 1);
        self.event_sender
            .send_or_log(Event::TravelOrderCreated {
                travel_order_id: created.id,
                document_number: number.clone(),
                assignment_id: assignment.id,
            })
            .await;

        info!(travel_order_id = %created.id, number = %number, "created travel order");
        Ok(created)
    }

    async fn check_access(
        &self,
        actor: &AuthUser,
        order: &travel_order::Model,
    ) -> Result<(), ServiceError> {
        if actor.is_staff() {
            return Ok(());
        }
        let assignment = SamplingAssignment::find_by_id(order.sampling_assignment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "assignment {} of travel order {} is missing",
                    order.sampling_assignment_id, order.id
                ))
            })?;
        ensure_assignment_access(actor, assignment.field_officer_id)
    }

    pub async fn get(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<travel_order::Model, ServiceError> {
        let order = TravelOrder::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("travel order {} not found", id)))?;
        self.check_access(actor, &order).await?;
        Ok(order)
    }

    pub async fn get_by_assignment(
        &self,
        actor: &AuthUser,
        assignment_id: Uuid,
    ) -> Result<travel_order::Model, ServiceError> {
        let order = TravelOrder::find()
            .filter(travel_order::Column::SamplingAssignmentId.eq(assignment_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no travel order for sampling assignment {}",
                    assignment_id
                ))
            })?;
        self.check_access(actor, &order).await?;
        Ok(order)
    }

    /// Field officers only see travel orders of their own assignments
    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        page: PageParams,
    ) -> Result<(Vec<travel_order::Model>, u64), ServiceError> {
        let (page, per_page) = page.normalized();

        let mut query = TravelOrder::find();
        if !actor.is_staff() {
            query = query
                .join(
                    JoinType::InnerJoin,
                    travel_order::Relation::SamplingAssignment.def(),
                )
                .filter(sampling_assignment::Column::FieldOfficerId.eq(actor.profile_id));
        }

        let paginator = query
            .order_by_desc(travel_order::Column::CreatedAt)
            .order_by_desc(travel_order::Column::DocumentNumber)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page - 1).await?;

        Ok((data, total))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = TravelOrder::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "travel order {} not found",
                id
            )));
        }

        self.event_sender
            .send_or_log(Event::TravelOrderDeleted {
                travel_order_id: id,
            })
            .await;
        info!(travel_order_id = %id, "deleted travel order");
        Ok(())
    }
}
