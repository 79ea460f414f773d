pub mod common;
pub mod dashboard;
pub mod job_orders;
pub mod profiles;
pub mod quotations;
pub mod sampling;
pub mod travel_orders;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    DashboardService, DocumentService, JobOrderService, ProfileService, QuotationService,
    SamplingService, TravelOrderService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub profiles: Arc<ProfileService>,
    pub quotations: Arc<QuotationService>,
    pub job_orders: Arc<JobOrderService>,
    pub sampling: Arc<SamplingService>,
    pub travel_orders: Arc<TravelOrderService>,
    pub documents: Arc<DocumentService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            profiles: Arc::new(ProfileService::new(db_pool.clone(), event_sender.clone())),
            quotations: Arc::new(QuotationService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            job_orders: Arc::new(JobOrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            sampling: Arc::new(SamplingService::new(db_pool.clone(), event_sender.clone())),
            travel_orders: Arc::new(TravelOrderService::new(
                db_pool.clone(),
                event_sender,
                config,
            )),
            documents: Arc::new(DocumentService::new(db_pool.clone())),
            dashboard: Arc::new(DashboardService::new(db_pool)),
        }
    }
}
