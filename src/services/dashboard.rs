use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Iterable, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    entities::{
        job_order, quotation, sampling_assignment, JobOrder, JobOrderStatus, ProfileRole,
        Quotation, QuotationStatus, SamplingAssignment, SamplingStatus,
    },
    errors::ServiceError,
};

pub const UPCOMING_LIMIT: u64 = 5;

/// Role-scoped status overview. Sections a role cannot see are omitted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub role: ProfileRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotations_by_status: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_orders_by_status: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignments_by_status: Option<BTreeMap<String, u64>>,
    /// Sum of paid and completed quotation totals
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub revenue: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upcoming_assignments: Option<Vec<sampling_assignment::Model>>,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, actor), fields(role = %actor.role))]
    pub async fn summary(&self, actor: &AuthUser) -> Result<DashboardSummary, ServiceError> {
        let mut summary = DashboardSummary {
            role: actor.role,
            quotations_by_status: None,
            job_orders_by_status: None,
            assignments_by_status: None,
            revenue: None,
            upcoming_assignments: None,
        };

        match actor.role {
            ProfileRole::Admin | ProfileRole::Operator => {
                summary.quotations_by_status =
                    Some(self.quotation_counts(Quotation::find()).await?);
                summary.job_orders_by_status = Some(self.job_order_counts().await?);
                summary.assignments_by_status =
                    Some(self.assignment_counts(SamplingAssignment::find()).await?);
                summary.revenue = Some(self.revenue().await?);
            }
            ProfileRole::FieldOfficer => {
                let own = SamplingAssignment::find().filter(
                    sampling_assignment::Column::FieldOfficerId.eq(actor.profile_id),
                );
                summary.assignments_by_status = Some(self.assignment_counts(own).await?);

                let upcoming = SamplingAssignment::find()
                    .filter(sampling_assignment::Column::FieldOfficerId.eq(actor.profile_id))
                    .filter(
                        sampling_assignment::Column::Status
                            .is_in([SamplingStatus::Pending, SamplingStatus::InProgress]),
                    )
                    .order_by_asc(sampling_assignment::Column::PlannedDate)
                    .order_by_asc(sampling_assignment::Column::CreatedAt)
                    .limit(UPCOMING_LIMIT)
                    .all(&*self.db)
                    .await?;
                summary.upcoming_assignments = Some(upcoming);
            }
            ProfileRole::Client => {
                let own = Quotation::find().filter(quotation::Column::ClientId.eq(actor.profile_id));
                summary.quotations_by_status = Some(self.quotation_counts(own).await?);
            }
        }

        Ok(summary)
    }

    async fn quotation_counts(
        &self,
        base: Select<Quotation>,
    ) -> Result<BTreeMap<String, u64>, ServiceError> {
        let mut counts = BTreeMap::new();
        for status in QuotationStatus::iter() {
            let n = base
                .clone()
                .filter(quotation::Column::Status.eq(status))
                .count(&*self.db)
                .await?;
            counts.insert(status.to_string(), n);
        }
        Ok(counts)
    }

    async fn job_order_counts(&self) -> Result<BTreeMap<String, u64>, ServiceError> {
        let mut counts = BTreeMap::new();
        for status in JobOrderStatus::iter() {
            let n = JobOrder::find()
                .filter(job_order::Column::Status.eq(status))
                .count(&*self.db)
                .await?;
            counts.insert(status.to_string(), n);
        }
        Ok(counts)
    }

    async fn assignment_counts(
        &self,
        base: Select<SamplingAssignment>,
    ) -> Result<BTreeMap<String, u64>, ServiceError> {
        let mut counts = BTreeMap::new();
        for status in SamplingStatus::iter() {
            let n = base
                .clone()
                .filter(sampling_assignment::Column::Status.eq(status))
                .count(&*self.db)
                .await?;
            counts.insert(status.to_string(), n);
        }
        Ok(counts)
    }

    async fn revenue(&self) -> Result<Decimal, ServiceError> {
        let totals = Quotation::find()
            .filter(
                quotation::Column::Status.is_in([QuotationStatus::Paid, QuotationStatus::Completed]),
            )
            .all(&*self.db)
            .await?;
        Ok(totals.iter().map(|q| q.total_amount).sum())
    }
}
