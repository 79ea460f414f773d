use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Travel and expense authorization for a sampling trip
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "travel_orders")]
#[schema(as = TravelOrder)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sampling_assignment_id: Uuid,
    #[sea_orm(unique)]
    pub document_number: String,
    pub destination: String,
    pub purpose: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub transport_budget: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub accommodation_budget: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub daily_allowance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub other_budget: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_budget: Decimal,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    #[sea_orm(nullable)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sampling_assignment::Entity",
        from = "Column::SamplingAssignmentId",
        to = "super::sampling_assignment::Column::Id"
    )]
    SamplingAssignment,
}

impl Related<super::sampling_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SamplingAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
