use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SamplingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Photo metadata; the binary lives in external storage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhotoRef {
    pub url: String,
    pub name: String,
}

/// Field-officer task tied to one job order
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "sampling_assignments")]
#[schema(as = SamplingAssignment)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub job_order_id: Uuid,
    pub field_officer_id: Uuid,
    pub status: SamplingStatus,
    #[sea_orm(nullable)]
    pub planned_date: Option<NaiveDate>,
    /// Stamped when the assignment completes
    #[sea_orm(nullable)]
    pub actual_date: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub location: Option<String>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Json")]
    #[schema(value_type = Vec<PhotoRef>)]
    pub photos: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Decodes the stored photo list, skipping entries that do not parse
    pub fn photo_refs(&self) -> Vec<PhotoRef> {
        match &self.photos {
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job_order::Entity",
        from = "Column::JobOrderId",
        to = "super::job_order::Column::Id"
    )]
    JobOrder,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::FieldOfficerId",
        to = "super::profile::Column::Id"
    )]
    FieldOfficer,
    #[sea_orm(has_one = "super::travel_order::Entity")]
    TravelOrder,
}

impl Related<super::job_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobOrder.def()
    }
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FieldOfficer.def()
    }
}

impl Related<super::travel_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TravelOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_refs_skips_malformed_entries() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            job_order_id: Uuid::new_v4(),
            field_officer_id: Uuid::new_v4(),
            status: SamplingStatus::Pending,
            planned_date: None,
            actual_date: None,
            location: None,
            notes: None,
            photos: serde_json::json!([
                {"url": "https://cdn.example.com/a.jpg", "name": "a.jpg"},
                {"url": 42},
            ]),
            created_at: now,
            updated_at: now,
        };

        let refs = model.photo_refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "a.jpg");
    }

    #[test]
    fn status_strings_match_storage_values() {
        assert_eq!(SamplingStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            "cancelled".parse::<SamplingStatus>().unwrap(),
            SamplingStatus::Cancelled
        );
    }
}
