//! Sampling assignments: the field work behind a job order.
//!
//! Every status change goes through [`sampling_transition`] and writes the
//! assignment and its mirrored job order status in one transaction.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::{
        job_order, sampling_assignment, travel_order, JobOrder, JobOrderStatus, PhotoRef, Profile,
        ProfileRole, SamplingAssignment, SamplingStatus, TravelOrder,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        ensure_assignment_access,
        status_transitions::{assignment_created_job_status, sampling_transition},
        validate_http_url, validate_not_blank, PageParams,
    },
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSamplingAssignmentInput {
    pub job_order_id: Uuid,
    pub field_officer_id: Uuid,
    pub planned_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSamplingStatusInput {
    pub status: SamplingStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddPhotoInput {
    #[validate(length(max = 2048), custom = "validate_http_url")]
    pub url: String,
    #[validate(length(min = 1, max = 255), custom = "validate_not_blank")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SamplingFilter {
    pub status: Option<SamplingStatus>,
    pub job_order_id: Option<Uuid>,
    pub field_officer_id: Option<Uuid>,
}

/// Assignment and job order as they stand after a write
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SamplingStatusUpdate {
    pub assignment: sampling_assignment::Model,
    pub job_order: job_order::Model,
}

#[derive(Clone)]
pub struct SamplingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl SamplingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Assigns a field officer to a job order and puts the job into sampling.
    #[instrument(skip(self))]
    pub async fn create_assignment(
        &self,
        input: CreateSamplingAssignmentInput,
    ) -> Result<SamplingStatusUpdate, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let job = JobOrder::find_by_id(input.job_order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("job order {} not found", input.job_order_id))
            })?;

        if SamplingAssignment::find()
            .filter(sampling_assignment::Column::JobOrderId.eq(job.id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "job order {} already has a sampling assignment",
                job.job_number
            )));
        }

        let officer = Profile::find_by_id(input.field_officer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "field officer {} not found",
                    input.field_officer_id
                ))
            })?;
        if officer.role != ProfileRole::FieldOfficer {
            return Err(ServiceError::ValidationError(format!(
                "profile {} is not a field officer",
                officer.id
            )));
        }

        let now = Utc::now();
        let assignment = sampling_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_order_id: Set(job.id),
            field_officer_id: Set(officer.id),
            status: Set(SamplingStatus::Pending),
            planned_date: Set(input.planned_date),
            actual_date: Set(None),
            location: Set(input.location),
            notes: Set(input.notes),
            photos: Set(serde_json::json!([])),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_write(
                e,
                format!(
                    "job order {} already has a sampling assignment",
                    job.job_number
                ),
            )
        })?;

        let old_job_status = job.status;
        let new_job_status = assignment_created_job_status(old_job_status);
        let job = set_job_status(&txn, job, new_job_status).await?;

        txn.commit().await?;

        counter!("labdesk.sampling_assignments.created", 1);
        self.event_sender
            .send_or_log(Event::SamplingAssignmentCreated {
                assignment_id: assignment.id,
                job_order_id: job.id,
                field_officer_id: officer.id,
            })
            .await;
        if old_job_status != new_job_status {
            self.event_sender
                .send_or_log(Event::JobOrderStatusChanged {
                    job_order_id: job.id,
                    old_status: old_job_status,
                    new_status: new_job_status,
                })
                .await;
        }

        info!(
            assignment_id = %assignment.id,
            job_order_id = %job.id,
            field_officer_id = %officer.id,
            "created sampling assignment"
        );
        Ok(SamplingStatusUpdate {
            assignment,
            job_order: job,
        })
    }

    async fn find(&self, id: Uuid) -> Result<sampling_assignment::Model, ServiceError> {
        SamplingAssignment::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sampling assignment {} not found", id)))
    }

    pub async fn get(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<sampling_assignment::Model, ServiceError> {
        let assignment = self.find(id).await?;
        ensure_assignment_access(actor, assignment.field_officer_id)?;
        Ok(assignment)
    }

    /// Field officers only see their own assignments
    #[instrument(skip(self, actor))]
    pub async fn list(
        &self,
        actor: &AuthUser,
        filter: SamplingFilter,
        page: PageParams,
    ) -> Result<(Vec<sampling_assignment::Model>, u64), ServiceError> {
        let (page, per_page) = page.normalized();

        let officer = if actor.is_staff() {
            filter.field_officer_id
        } else {
            Some(actor.profile_id)
        };

        let mut query = SamplingAssignment::find();
        if let Some(officer) = officer {
            query = query.filter(sampling_assignment::Column::FieldOfficerId.eq(officer));
        }
        if let Some(status) = filter.status {
            query = query.filter(sampling_assignment::Column::Status.eq(status));
        }
        if let Some(job_order_id) = filter.job_order_id {
            query = query.filter(sampling_assignment::Column::JobOrderId.eq(job_order_id));
        }

        let paginator = query
            .order_by_desc(sampling_assignment::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page - 1).await?;

        Ok((data, total))
    }

    /// Moves the assignment to `input.status`, stamping `actual_date` on
    /// completion and mirroring the job order status.
    #[instrument(skip(self, actor), fields(actor = %actor.profile_id))]
    pub async fn update_status(
        &self,
        actor: &AuthUser,
        id: Uuid,
        input: UpdateSamplingStatusInput,
    ) -> Result<SamplingStatusUpdate, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let assignment = SamplingAssignment::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sampling assignment {} not found", id)))?;
        ensure_assignment_access(actor, assignment.field_officer_id)?;

        let job = JobOrder::find_by_id(assignment.job_order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "job order {} of assignment {} is missing",
                    assignment.job_order_id, id
                ))
            })?;

        let old_status = assignment.status;
        let old_job_status = job.status;
        let transition = sampling_transition(old_status, old_job_status, input.status)
            .map_err(|e| {
                warn!(assignment_id = %id, error = %e, "rejected sampling status change");
                ServiceError::from(e)
            })?;

        if transition.is_noop(old_status, old_job_status) && input.notes.is_none() {
            txn.commit().await?;
            return Ok(SamplingStatusUpdate {
                assignment,
                job_order: job,
            });
        }

        let now = Utc::now();
        let mut active: sampling_assignment::ActiveModel = assignment.into();
        active.status = Set(transition.assignment);
        if transition.stamp_actual_date {
            active.actual_date = Set(Some(now));
        }
        if input.notes.is_some() {
            active.notes = Set(input.notes);
        }
        active.updated_at = Set(now);
        let assignment = active.update(&txn).await?;

        let job = match transition.job_order {
            Some(status) => set_job_status(&txn, job, status).await?,
            None => job,
        };

        txn.commit().await?;

        if old_status != assignment.status {
            counter!(
                "labdesk.sampling_assignments.status_changed",
                1,
                "to" => assignment.status.to_string()
            );
            self.event_sender
                .send_or_log(Event::SamplingStatusChanged {
                    assignment_id: assignment.id,
                    job_order_id: job.id,
                    old_status,
                    new_status: assignment.status,
                    job_order_status: job.status,
                    changed_at: now,
                })
                .await;
        }
        if old_job_status != job.status {
            self.event_sender
                .send_or_log(Event::JobOrderStatusChanged {
                    job_order_id: job.id,
                    old_status: old_job_status,
                    new_status: job.status,
                })
                .await;
        }

        info!(
            assignment_id = %assignment.id,
            from = %old_status,
            to = %assignment.status,
            job_status = %job.status,
            "sampling status updated"
        );
        Ok(SamplingStatusUpdate {
            assignment,
            job_order: job,
        })
    }

    /// Records photo metadata; names are unique within an assignment.
    #[instrument(skip(self, actor))]
    pub async fn add_photo(
        &self,
        actor: &AuthUser,
        id: Uuid,
        input: AddPhotoInput,
    ) -> Result<sampling_assignment::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let assignment = SamplingAssignment::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sampling assignment {} not found", id)))?;
        ensure_assignment_access(actor, assignment.field_officer_id)?;

        let mut photos = assignment.photo_refs();
        let name = input.name.trim().to_string();
        if photos.iter().any(|p| p.name == name) {
            return Err(ServiceError::Conflict(format!(
                "photo '{}' already exists on this assignment",
                name
            )));
        }
        photos.push(PhotoRef {
            url: input.url.trim().to_string(),
            name,
        });

        let updated = write_photos(&txn, assignment, &photos).await?;
        txn.commit().await?;

        info!(assignment_id = %id, photos = photos.len(), "photo added");
        Ok(updated)
    }

    #[instrument(skip(self, actor))]
    pub async fn remove_photo(
        &self,
        actor: &AuthUser,
        id: Uuid,
        name: &str,
    ) -> Result<sampling_assignment::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let assignment = SamplingAssignment::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sampling assignment {} not found", id)))?;
        ensure_assignment_access(actor, assignment.field_officer_id)?;

        let name = name.trim();
        let mut photos = assignment.photo_refs();
        let before = photos.len();
        photos.retain(|p| p.name != name);
        if photos.len() == before {
            return Err(ServiceError::NotFound(format!(
                "photo '{}' not found on assignment {}",
                name, id
            )));
        }

        let updated = write_photos(&txn, assignment, &photos).await?;
        txn.commit().await?;

        info!(assignment_id = %id, photos = photos.len(), "photo removed");
        Ok(updated)
    }

    /// Deletes the assignment and its travel order. The job order keeps its status.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let assignment = SamplingAssignment::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sampling assignment {} not found", id)))?;

        TravelOrder::delete_many()
            .filter(travel_order::Column::SamplingAssignmentId.eq(assignment.id))
            .exec(&txn)
            .await?;
        SamplingAssignment::delete_by_id(assignment.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::SamplingAssignmentDeleted { assignment_id: id })
            .await;
        info!(assignment_id = %id, "deleted sampling assignment");
        Ok(())
    }
}

async fn set_job_status(
    txn: &DatabaseTransaction,
    job: job_order::Model,
    status: JobOrderStatus,
) -> Result<job_order::Model, ServiceError> {
    if job.status == status {
        return Ok(job);
    }
    let mut active: job_order::ActiveModel = job.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    Ok(active.update(txn).await?)
}

async fn write_photos(
    txn: &DatabaseTransaction,
    assignment: sampling_assignment::Model,
    photos: &[PhotoRef],
) -> Result<sampling_assignment::Model, ServiceError> {
    let photos = serde_json::to_value(photos)
        .map_err(|e| ServiceError::InternalError(format!("cannot encode photos: {}", e)))?;
    let mut active: sampling_assignment::ActiveModel = assignment.into();
    active.photos = Set(photos);
    active.updated_at = Set(Utc::now());
    Ok(active.update(txn).await?)
}
