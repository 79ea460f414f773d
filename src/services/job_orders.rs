use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    entities::{
        job_order, quotation, sampling_assignment, travel_order, JobOrder, JobOrderStatus,
        Quotation, QuotationStatus, SamplingAssignment, TravelOrder,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        document_numbers::{DocumentKind, DocumentNumberService},
        status_transitions::{
            job_order_transition, quotation_accepts_job_order, quotation_on_job_completed,
        },
        PageParams,
    },
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateJobOrderInput {
    pub quotation_id: Uuid,
    pub scheduled_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateJobOrderStatusInput {
    pub status: JobOrderStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobOrderFilter {
    pub status: Option<JobOrderStatus>,
    pub quotation_id: Option<Uuid>,
}

/// Job order with the records hanging off it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobOrderDetail {
    pub job_order: job_order::Model,
    pub quotation: quotation::Model,
    pub sampling_assignment: Option<sampling_assignment::Model>,
}

/// Result of a job order status update; `quotation` is set when it moved too
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobOrderStatusUpdate {
    pub job_order: job_order::Model,
    pub quotation: Option<quotation::Model>,
}

#[derive(Clone)]
pub struct JobOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    numbers: DocumentNumberService,
}

impl JobOrderService {
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

    /// Opens the job order for an accepted or paid quotation.
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateJobOrderInput) -> Result<job_order::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let quotation = Quotation::find_by_id(input.quotation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("quotation {} not found", input.quotation_id))
            })?;

        if !quotation_accepts_job_order(quotation.status) {
            return Err(ServiceError::InvalidStatus(format!(
                "quotation {} is {}; job orders need an accepted or paid quotation",
                quotation.quotation_number, quotation.status
            )));
        }

        if JobOrder::find()
            .filter(job_order::Column::QuotationId.eq(quotation.id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "quotation {} already has a job order",
                quotation.quotation_number
            )));
        }

        let now = Utc::now();
        let number = self
            .numbers
            .next_number(&txn, DocumentKind::JobOrder, now)
            .await?;

        let created = job_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_number: Set(number.clone()),
            quotation_id: Set(quotation.id),
            status: Set(JobOrderStatus::Scheduled),
            scheduled_date: Set(input.scheduled_date),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(
                e,
                format!(
                    "quotation {} already has a job order",
                    quotation.quotation_number
                ),
            )
        })?;

        txn.commit().await?;

        counter!("labdesk.job_orders.created", 1);
        self.event_sender
            .send_or_log(Event::JobOrderCreated {
                job_order_id: created.id,
                job_number: number.clone(),
                quotation_id: quotation.id,
            })
            .await;

        info!(job_order_id = %created.id, number = %number, "created job order");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<job_order::Model, ServiceError> {
        JobOrder::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("job order {} not found", id)))
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<JobOrderDetail, ServiceError> {
        let job_order = self.get(id).await?;
        let quotation = Quotation::find_by_id(job_order.quotation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "quotation {} of job order {} is missing",
                    job_order.quotation_id, id
                ))
            })?;
        let sampling_assignment = SamplingAssignment::find()
            .filter(sampling_assignment::Column::JobOrderId.eq(id))
            .one(&*self.db)
            .await?;

        Ok(JobOrderDetail {
            job_order,
            quotation,
            sampling_assignment,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: JobOrderFilter,
        page: PageParams,
    ) -> Result<(Vec<job_order::Model>, u64), ServiceError> {
        let (page, per_page) = page.normalized();

        let mut query = JobOrder::find();
        if let Some(status) = filter.status {
            query = query.filter(job_order::Column::Status.eq(status));
        }
        if let Some(quotation_id) = filter.quotation_id {
            query = query.filter(job_order::Column::QuotationId.eq(quotation_id));
        }

        let paginator = query
            .order_by_desc(job_order::Column::CreatedAt)
            .order_by_desc(job_order::Column::JobNumber)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page - 1).await?;

        Ok((data, total))
    }

    /// Moves a job order one stage forward. Completing it also completes an
    /// accepted or paid quotation, in the same transaction.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        input: UpdateJobOrderStatusInput,
    ) -> Result<JobOrderStatusUpdate, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let current = JobOrder::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("job order {} not found", id)))?;

        let old_status = current.status;
        let new_status = job_order_transition(old_status, input.status)?;
        if new_status == old_status && input.notes.is_none() {
            txn.commit().await?;
            return Ok(JobOrderStatusUpdate {
                job_order: current,
                quotation: None,
            });
        }

        let quotation_id = current.quotation_id;
        let mut active: job_order::ActiveModel = current.into();
        active.status = Set(new_status);
        if input.notes.is_some() {
            active.notes = Set(input.notes);
        }
        active.updated_at = Set(Utc::now());
        let job_order = active.update(&txn).await?;

        let mut quotation_change: Option<(QuotationStatus, quotation::Model)> = None;
        if new_status == JobOrderStatus::Completed && old_status != new_status {
            if let Some(quotation) = Quotation::find_by_id(quotation_id).one(&txn).await? {
                if let Some(next) = quotation_on_job_completed(quotation.status) {
                    let previous = quotation.status;
                    let mut active: quotation::ActiveModel = quotation.into();
                    active.status = Set(next);
                    active.updated_at = Set(Utc::now());
                    quotation_change = Some((previous, active.update(&txn).await?));
                }
            }
        }

        txn.commit().await?;

        if old_status != new_status {
            counter!("labdesk.job_orders.status_changed", 1, "to" => new_status.to_string());
            self.event_sender
                .send_or_log(Event::JobOrderStatusChanged {
                    job_order_id: id,
                    old_status,
                    new_status,
                })
                .await;
            info!(job_order_id = %id, from = %old_status, to = %new_status, "job order status changed");
        }

        if let Some((previous, quotation)) = &quotation_change {
            self.event_sender
                .send_or_log(Event::QuotationStatusChanged {
                    quotation_id: quotation.id,
                    old_status: *previous,
                    new_status: quotation.status,
                })
                .await;
        }

        Ok(JobOrderStatusUpdate {
            job_order,
            quotation: quotation_change.map(|(_, quotation)| quotation),
        })
    }

    /// Deletes the job order together with its assignment and travel order.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let job_order = JobOrder::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("job order {} not found", id)))?;

        if let Some(assignment) = SamplingAssignment::find()
            .filter(sampling_assignment::Column::JobOrderId.eq(job_order.id))
            .one(&txn)
            .await?
        {
            TravelOrder::delete_many()
                .filter(travel_order::Column::SamplingAssignmentId.eq(assignment.id))
                .exec(&txn)
                .await?;
            SamplingAssignment::delete_by_id(assignment.id)
                .exec(&txn)
                .await?;
        }

        JobOrder::delete_by_id(job_order.id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::JobOrderDeleted { job_order_id: id })
            .await;
        info!(job_order_id = %id, number = %job_order.job_number, "deleted job order");
        Ok(())
    }
}
