use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::{profile, Profile, ProfileRole},
    errors::ServiceError,
    events::{Event, EventSender},
    services::PageParams,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProfileInput {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub role: ProfileRole,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfileFilter {
    pub role: Option<ProfileRole>,
}

/// Back-office management of staff, field officers and clients
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProfileService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateProfileInput) -> Result<profile::Model, ServiceError> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if Profile::find()
            .filter(profile::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "profile with email {} already exists",
                email
            )));
        }

        let now = Utc::now();
        let model = profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(input.full_name.trim().to_string()),
            email: Set(email.clone()),
            role: Set(input.role),
            phone: Set(input.phone),
            company_name: Set(input.company_name),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("profile with email {} already exists", email))
        })?;

        self.event_sender
            .send_or_log(Event::ProfileCreated {
                profile_id: model.id,
            })
            .await;

        info!(profile_id = %model.id, role = %model.role, "created profile");
        Ok(model)
    }

    pub async fn get(&self, id: Uuid) -> Result<profile::Model, ServiceError> {
        Profile::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("profile {} not found", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<profile::Model>, ServiceError> {
        Ok(Profile::find()
            .filter(profile::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?)
    }

    /// Profile behind the caller's token
    pub async fn me(&self, actor: &AuthUser) -> Result<profile::Model, ServiceError> {
        self.get(actor.profile_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProfileFilter,
        page: PageParams,
    ) -> Result<(Vec<profile::Model>, u64), ServiceError> {
        let (page, per_page) = page.normalized();

        let mut query = Profile::find();
        if let Some(role) = filter.role {
            query = query.filter(profile::Column::Role.eq(role));
        }

        let paginator = query
            .order_by_asc(profile::Column::FullName)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page - 1).await?;

        Ok((data, total))
    }
}
