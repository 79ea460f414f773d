#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use labdesk_api::{
    app_router,
    auth::{AuthUser, TokenSubject},
    config::AppConfig,
    db,
    entities::{job_order, profile, quotation, sampling_assignment, ProfileRole, QuotationStatus},
    events::{self, EventSender},
    services::{
        job_orders::CreateJobOrderInput,
        profiles::CreateProfileInput,
        quotations::{CreateQuotationInput, QuotationItemInput, UpdateQuotationStatusInput},
        sampling::CreateSamplingAssignmentInput,
        travel_orders::CreateTravelOrderInput,
    },
    AppState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "labdesk_test_secret_with_plenty_of_distinct_chars_42";

/// Application state and router over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller tweak the configuration
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), Arc::new(cfg), event_sender);
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn seed_profile(&self, role: ProfileRole, name: &str) -> profile::Model {
        let slug = name.to_lowercase().replace(' ', ".");
        self.state
            .services
            .profiles
            .create(CreateProfileInput {
                full_name: name.to_string(),
                email: format!("{}.{}@lab.example.com", slug, Uuid::new_v4().simple()),
                role,
                phone: None,
                company_name: (role == ProfileRole::Client).then(|| format!("{} Ltd", name)),
            })
            .await
            .expect("seed profile")
    }

    pub fn token_for(&self, profile: &profile::Model) -> String {
        self.state
            .auth
            .issue_token(&TokenSubject::from(profile))
            .expect("issue token")
            .access_token
    }

    /// Quotation for `client` walked through sent and accepted
    pub async fn accepted_quotation(
        &self,
        staff: &AuthUser,
        client: &profile::Model,
    ) -> quotation::Model {
        let created = self
            .state
            .services
            .quotations
            .create(staff, quotation_input(client.id))
            .await
            .expect("create quotation");

        for status in [QuotationStatus::Sent, QuotationStatus::Accepted] {
            self.state
                .services
                .quotations
                .update_status(created.quotation.id, UpdateQuotationStatusInput { status })
                .await
                .expect("advance quotation");
        }

        self.state
            .services
            .quotations
            .get(staff, created.quotation.id)
            .await
            .expect("reload quotation")
            .quotation
    }

    pub async fn job_order_for(&self, quotation: &quotation::Model) -> job_order::Model {
        self.state
            .services
            .job_orders
            .create(CreateJobOrderInput {
                quotation_id: quotation.id,
                scheduled_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                notes: None,
            })
            .await
            .expect("create job order")
    }

    pub async fn assign(
        &self,
        job: &job_order::Model,
        officer: &profile::Model,
    ) -> sampling_assignment::Model {
        self.state
            .services
            .sampling
            .create_assignment(CreateSamplingAssignmentInput {
                job_order_id: job.id,
                field_officer_id: officer.id,
                planned_date: NaiveDate::from_ymd_opt(2025, 3, 12),
                location: Some("Outfall 3, Cikarang".to_string()),
                notes: None,
            })
            .await
            .expect("create assignment")
            .assignment
    }

    /// Full chain up to a pending assignment
    pub async fn workflow(&self) -> Workflow {
        let operator = self.seed_profile(ProfileRole::Operator, "Olivia Operator").await;
        let client = self.seed_profile(ProfileRole::Client, "Citra Client").await;
        let officer = self
            .seed_profile(ProfileRole::FieldOfficer, "Fajar Officer")
            .await;
        let staff = actor(&operator);

        let quotation = self.accepted_quotation(&staff, &client).await;
        let job = self.job_order_for(&quotation).await;
        let assignment = self.assign(&job, &officer).await;

        Workflow {
            operator,
            client,
            officer,
            quotation,
            job,
            assignment,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub struct Workflow {
    pub operator: profile::Model,
    pub client: profile::Model,
    pub officer: profile::Model,
    pub quotation: quotation::Model,
    pub job: job_order::Model,
    pub assignment: sampling_assignment::Model,
}

pub fn actor(profile: &profile::Model) -> AuthUser {
    AuthUser {
        profile_id: profile.id,
        name: Some(profile.full_name.clone()),
        email: Some(profile.email.clone()),
        role: profile.role,
        token_id: Uuid::new_v4().to_string(),
    }
}

pub fn quotation_input(client_id: Uuid) -> CreateQuotationInput {
    CreateQuotationInput {
        client_id,
        title: "Quarterly wastewater monitoring".to_string(),
        items: vec![
            QuotationItemInput {
                parameter: "BOD".to_string(),
                sample_type: Some("Wastewater".to_string()),
                regulation: Some("PermenLH 5/2014".to_string()),
                quantity: 2,
                unit_price: dec!(150000),
            },
            QuotationItemInput {
                parameter: "COD".to_string(),
                sample_type: Some("Wastewater".to_string()),
                regulation: None,
                quantity: 2,
                unit_price: dec!(100000),
            },
        ],
        perdiem_price: dec!(200000),
        perdiem_quantity: 1,
        transport_price: dec!(300000),
        transport_quantity: 1,
        tax_rate: Some(dec!(0.11)),
        discount_amount: Decimal::ZERO,
        valid_until: NaiveDate::from_ymd_opt(2025, 4, 30),
        notes: None,
    }
}

pub fn travel_order_input(assignment_id: Uuid) -> CreateTravelOrderInput {
    CreateTravelOrderInput {
        sampling_assignment_id: assignment_id,
        destination: "Cikarang industrial estate".to_string(),
        purpose: "Wastewater sampling".to_string(),
        departure_date: NaiveDate::from_ymd_opt(2025, 3, 12).expect("valid date"),
        return_date: NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date"),
        transport_budget: dec!(500000),
        accommodation_budget: dec!(700000),
        daily_allowance: dec!(150000),
        other_budget: Decimal::ZERO,
        notes: None,
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is json")
}
