mod common;

use std::collections::HashSet;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{actor, quotation_input, TestApp};
use futures::future::join_all;
use labdesk_api::{
    entities::{travel_order, DocumentSequence, ProfileRole, TravelOrder},
    services::document_numbers::{parse_sequence, DocumentKind, DocumentNumberService},
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveValue::Set, EntityTrait};
use uuid::Uuid;

/// Stores a travel order row directly, leaving the counter table untouched
async fn insert_travel_order_row(app: &TestApp, assignment_id: Uuid, number: &str) {
    let now = Utc::now();
    let day = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
    TravelOrder::insert(travel_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        sampling_assignment_id: Set(assignment_id),
        document_number: Set(number.to_string()),
        destination: Set("Cikarang".to_string()),
        purpose: Set("Wastewater sampling".to_string()),
        departure_date: Set(day),
        return_date: Set(day),
        transport_budget: Set(dec!(0)),
        accommodation_budget: Set(dec!(0)),
        daily_allowance: Set(dec!(0)),
        other_budget: Set(dec!(0)),
        total_budget: Set(dec!(0)),
        notes: Set(None),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .exec_without_returning(&*app.state.db)
    .await
    .unwrap();
}

#[tokio::test]
async fn sequential_numbers_increase_within_a_month() {
    let app = TestApp::new().await;
    let numbers = DocumentNumberService::new(0, 5);
    let at = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();

    let mut issued = Vec::new();
    for _ in 0..3 {
        issued.push(
            numbers
                .next_number(&*app.state.db, DocumentKind::TravelOrder, at)
                .await
                .unwrap(),
        );
    }

    assert_eq!(
        issued,
        vec!["TO/2025/03/0001", "TO/2025/03/0002", "TO/2025/03/0003"]
    );
}

#[tokio::test]
async fn each_month_and_kind_has_its_own_counter() {
    let app = TestApp::new().await;
    let numbers = DocumentNumberService::new(0, 5);
    let db = &*app.state.db;
    let march = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();
    let april = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();

    let q1 = numbers
        .next_number(db, DocumentKind::Quotation, march)
        .await
        .unwrap();
    let q2 = numbers
        .next_number(db, DocumentKind::Quotation, march)
        .await
        .unwrap();
    let q_april = numbers
        .next_number(db, DocumentKind::Quotation, april)
        .await
        .unwrap();
    let jo = numbers
        .next_number(db, DocumentKind::JobOrder, march)
        .await
        .unwrap();

    assert_eq!(q1, "QUO/2025/03/0001");
    assert_eq!(q2, "QUO/2025/03/0002");
    assert_eq!(q_april, "QUO/2025/04/0001");
    assert_eq!(jo, "JO/2025/03/0001");
}

#[tokio::test]
async fn configured_offset_picks_the_local_month() {
    let app = TestApp::new().await;
    // 20:00 UTC on March 31st is already April 1st at UTC+7
    let at = Utc.with_ymd_and_hms(2025, 3, 31, 20, 0, 0).unwrap();

    let number = DocumentNumberService::new(7 * 60, 5)
        .next_number(&*app.state.db, DocumentKind::JobOrder, at)
        .await
        .unwrap();
    assert_eq!(number, "JO/2025/04/0001");
}

#[tokio::test]
async fn missing_counter_is_seeded_from_stored_numbers() {
    let app = TestApp::new().await;
    let flow = app.workflow().await;
    insert_travel_order_row(&app, flow.assignment.id, "TO/2025/03/0007").await;

    let march = Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap();
    assert!(DocumentSequence::find_by_id("TO/2025/03/".to_string())
        .one(&*app.state.db)
        .await
        .unwrap()
        .is_none());

    let number = DocumentNumberService::new(0, 5)
        .next_number(&*app.state.db, DocumentKind::TravelOrder, march)
        .await
        .unwrap();
    assert_eq!(number, "TO/2025/03/0008");
}

#[tokio::test]
async fn seeding_uses_the_numerically_highest_sequence() {
    let app = TestApp::new().await;
    let first = app.workflow().await;
    let second = app.workflow().await;
    insert_travel_order_row(&app, first.assignment.id, "TO/2025/03/9999").await;
    insert_travel_order_row(&app, second.assignment.id, "TO/2025/03/10000").await;

    let march = Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap();
    let number = DocumentNumberService::new(0, 5)
        .next_number(&*app.state.db, DocumentKind::TravelOrder, march)
        .await
        .unwrap();
    assert_eq!(number, "TO/2025/03/10001");
}

// The test pool holds a single SQLite connection, so these tasks interleave
// on one connection rather than racing in separate transactions. It checks
// that every awaited allocation observes the previous bump.
#[tokio::test]
async fn concurrent_allocation_never_repeats() {
    const TASKS: u32 = 16;

    let app = TestApp::new().await;
    let numbers = DocumentNumberService::new(0, TASKS + 1);
    let at = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();

    let handles = (0..TASKS).map(|_| {
        let db = app.state.db.clone();
        let numbers = numbers.clone();
        tokio::spawn(async move {
            numbers
                .next_number(&*db, DocumentKind::Quotation, at)
                .await
        })
    });

    let mut sequences = Vec::new();
    for result in join_all(handles).await {
        let number = result.expect("task panicked").expect("allocation failed");
        sequences.push(parse_sequence(&number, "QUO/2025/06/").expect("number in scope"));
    }

    let unique: HashSet<u32> = sequences.iter().copied().collect();
    assert_eq!(unique.len(), TASKS as usize);
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=TASKS).collect::<Vec<_>>());
}

#[tokio::test]
async fn quotations_receive_consecutive_numbers() {
    let app = TestApp::new().await;
    let operator = app.seed_profile(ProfileRole::Operator, "Nadia Operator").await;
    let client = app.seed_profile(ProfileRole::Client, "Budi Client").await;
    let staff = actor(&operator);

    let first = app
        .state
        .services
        .quotations
        .create(&staff, quotation_input(client.id))
        .await
        .unwrap()
        .quotation;
    let second = app
        .state
        .services
        .quotations
        .create(&staff, quotation_input(client.id))
        .await
        .unwrap()
        .quotation;

    let scope = first
        .quotation_number
        .rsplit_once('/')
        .map(|(scope, _)| format!("{}/", scope))
        .expect("number has a sequence part");
    assert!(scope.starts_with("QUO/"));

    let a = parse_sequence(&first.quotation_number, &scope).unwrap();
    let b = parse_sequence(&second.quotation_number, &scope).unwrap();
    assert_eq!(b, a + 1);
}

#[tokio::test]
async fn counter_resumes_after_existing_numbers() {
    let app = TestApp::new().await;
    let operator = app.seed_profile(ProfileRole::Operator, "Rudi Operator").await;
    let client = app.seed_profile(ProfileRole::Client, "Sari Client").await;

    let created = app
        .state
        .services
        .quotations
        .create(&actor(&operator), quotation_input(client.id))
        .await
        .unwrap()
        .quotation;

    // A second allocator with its own settings shares the same table row
    let next = DocumentNumberService::new(0, 5)
        .next_number(&*app.state.db, DocumentKind::Quotation, created.created_at)
        .await
        .unwrap();
    assert_ne!(next, created.quotation_number);
    assert!(next > created.quotation_number);
}
