mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::{actor, travel_order_input, TestApp};
use labdesk_api::{
    entities::{ProfileRole, SamplingStatus},
    errors::ServiceError,
    services::{sampling::UpdateSamplingStatusInput, PageParams},
};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn travel_order_gets_number_and_total_budget() {
    let app = TestApp::new().await;
    let flow = app.workflow().await;

    let order = app
        .state
        .services
        .travel_orders
        .create(&actor(&flow.operator), travel_order_input(flow.assignment.id))
        .await
        .unwrap();

    assert!(order.document_number.starts_with("TO/"));
    assert!(order.document_number.ends_with("/0001"));
    assert_eq!(order.total_budget, dec!(1350000));
    assert_eq!(order.sampling_assignment_id, flow.assignment.id);
}

#[tokio::test]
async fn second_travel_order_for_assignment_conflicts() {
    let app = TestApp::new().await;
    let flow = app.workflow().await;
    let staff = actor(&flow.operator);
    let travel = &app.state.services.travel_orders;

    travel
        .create(&staff, travel_order_input(flow.assignment.id))
        .await
        .unwrap();
    let err = travel
        .create(&staff, travel_order_input(flow.assignment.id))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Conflict(_));
    let (_, total) = travel.list(&staff, PageParams::default()).await.unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn unknown_assignment_is_not_found() {
    let app = TestApp::new().await;
    let operator = app.seed_profile(ProfileRole::Operator, "Tono Operator").await;

    let err = app
        .state
        .services
        .travel_orders
        .create(&actor(&operator), travel_order_input(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn cancelled_assignment_cannot_travel() {
    let app = TestApp::new().await;
    let flow = app.workflow().await;
    let staff = actor(&flow.operator);

    app.state
        .services
        .sampling
        .update_status(
            &staff,
            flow.assignment.id,
            UpdateSamplingStatusInput {
                status: SamplingStatus::Cancelled,
                notes: None,
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .services
        .travel_orders
        .create(&staff, travel_order_input(flow.assignment.id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn return_before_departure_is_rejected() {
    let app = TestApp::new().await;
    let flow = app.workflow().await;

    let mut input = travel_order_input(flow.assignment.id);
    input.return_date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();

    let err = app
        .state
        .services
        .travel_orders
        .create(&actor(&flow.operator), input)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn officer_reads_own_travel_order_and_document() {
    let app = TestApp::new().await;
    let flow = app.workflow().await;
    let order = app
        .state
        .services
        .travel_orders
        .create(&actor(&flow.operator), travel_order_input(flow.assignment.id))
        .await
        .unwrap();

    let officer = actor(&flow.officer);
    let by_assignment = app
        .state
        .services
        .travel_orders
        .get_by_assignment(&officer, flow.assignment.id)
        .await
        .unwrap();
    assert_eq!(by_assignment.id, order.id);

    let document = app
        .state
        .services
        .documents
        .travel_order_document(&officer, order.id)
        .await
        .unwrap();
    assert_eq!(document.document_number, order.document_number);
    assert_eq!(document.officer_name, flow.officer.full_name);
    assert_eq!(document.duration_days, 3);
    assert_eq!(document.departure_date, "12 March 2025");

    let stranger = app
        .seed_profile(ProfileRole::FieldOfficer, "Stranger Officer")
        .await;
    let err = app
        .state
        .services
        .travel_orders
        .get(&actor(&stranger), order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let (rows, total) = app
        .state
        .services
        .travel_orders
        .list(&actor(&stranger), PageParams::default())
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn deleting_assignment_removes_travel_order() {
    let app = TestApp::new().await;
    let flow = app.workflow().await;
    let staff = actor(&flow.operator);
    let order = app
        .state
        .services
        .travel_orders
        .create(&staff, travel_order_input(flow.assignment.id))
        .await
        .unwrap();

    app.state
        .services
        .sampling
        .delete(flow.assignment.id)
        .await
        .unwrap();

    let err = app
        .state
        .services
        .travel_orders
        .get(&staff, order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
