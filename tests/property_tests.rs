//! Property tests for the status machines, document numbering and quotation totals.

use chrono::NaiveDate;
use labdesk_api::{
    entities::{JobOrderStatus, QuotationStatus, SamplingStatus},
    services::{
        document_numbers::{format_number, parse_sequence, scope_for, DocumentKind},
        quotations::{compute_totals, QuotationItemInput},
        status_transitions::{
            job_order_transition, mirrored_job_status, quotation_move_allowed,
            quotation_transition, sampling_move_allowed, sampling_transition,
        },
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use sea_orm::Iterable;

fn sampling_status() -> impl Strategy<Value = SamplingStatus> {
    prop::sample::select(SamplingStatus::iter().collect::<Vec<_>>())
}

fn job_status() -> impl Strategy<Value = JobOrderStatus> {
    prop::sample::select(JobOrderStatus::iter().collect::<Vec<_>>())
}

fn quotation_status() -> impl Strategy<Value = QuotationStatus> {
    prop::sample::select(QuotationStatus::iter().collect::<Vec<_>>())
}

fn document_kind() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::Quotation),
        Just(DocumentKind::JobOrder),
        Just(DocumentKind::TravelOrder),
    ]
}

fn month_start() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12).prop_map(|(y, m)| {
        NaiveDate::from_ymd_opt(y, m, 1).expect("first of month is always valid")
    })
}

/// Whole-rupiah or two-decimal prices
fn price() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..=2).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn item() -> impl Strategy<Value = QuotationItemInput> {
    (1i32..50, price()).prop_map(|(quantity, unit_price)| QuotationItemInput {
        parameter: "pH".to_string(),
        sample_type: None,
        regulation: None,
        quantity,
        unit_price,
    })
}

fn tax_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=100).prop_map(|pct| Decimal::new(pct, 2))
}

proptest! {
    #[test]
    fn sampling_result_mirrors_job_order(
        assignment in sampling_status(),
        job in job_status(),
        target in sampling_status(),
    ) {
        match sampling_transition(assignment, job, target) {
            Ok(outcome) => {
                prop_assert_eq!(outcome.assignment, target);
                if assignment == target {
                    prop_assert!(outcome.is_noop(assignment, job));
                } else {
                    prop_assert!(sampling_move_allowed(assignment, target));
                    prop_assert_eq!(outcome.stamp_actual_date, target == SamplingStatus::Completed);
                    let effective = outcome.job_order.unwrap_or(job);
                    if let Some(mirrored) = mirrored_job_status(target) {
                        prop_assert_eq!(effective, mirrored);
                    } else {
                        prop_assert_eq!(outcome.job_order, None);
                    }
                }
            }
            Err(_) => {
                prop_assert_ne!(assignment, target);
                prop_assert!(!sampling_move_allowed(assignment, target));
            }
        }
    }

    #[test]
    fn terminal_sampling_states_stay_terminal(
        job in job_status(),
        target in sampling_status(),
    ) {
        for terminal in [SamplingStatus::Completed, SamplingStatus::Cancelled] {
            let result = sampling_transition(terminal, job, target);
            prop_assert_eq!(result.is_ok(), terminal == target);
        }
    }

    #[test]
    fn job_orders_move_one_stage_forward(from in job_status(), to in job_status()) {
        let position = |s: JobOrderStatus| {
            JobOrderStatus::iter().position(|x| x == s).expect("status is enumerated")
        };
        let allowed = from == to || position(to) == position(from) + 1;
        prop_assert_eq!(job_order_transition(from, to).is_ok(), allowed);
    }

    #[test]
    fn quotation_transition_agrees_with_table(from in quotation_status(), to in quotation_status()) {
        match quotation_transition(from, to) {
            Ok(next) => {
                prop_assert_eq!(next, to);
                prop_assert!(from == to || quotation_move_allowed(from, to));
            }
            Err(_) => prop_assert!(!quotation_move_allowed(from, to)),
        }
    }

    #[test]
    fn completed_quotations_are_final(to in quotation_status()) {
        prop_assume!(to != QuotationStatus::Completed);
        prop_assert!(quotation_transition(QuotationStatus::Completed, to).is_err());
    }

    #[test]
    fn numbers_round_trip_within_scope(
        kind in document_kind(),
        date in month_start(),
        seq in 1u32..100_000,
    ) {
        let scope = scope_for(kind, date);
        let number = format_number(&scope, seq);
        prop_assert!(number.starts_with(kind.prefix()));
        prop_assert_eq!(parse_sequence(&number, &scope), Some(seq));
    }

    #[test]
    fn padded_numbers_sort_like_their_sequence(
        kind in document_kind(),
        date in month_start(),
        a in 1u32..10_000,
        b in 1u32..10_000,
    ) {
        let scope = scope_for(kind, date);
        let (na, nb) = (format_number(&scope, a), format_number(&scope, b));
        prop_assert_eq!(a.cmp(&b), na.cmp(&nb));
    }

    #[test]
    fn numbers_from_another_scope_are_ignored(
        date in month_start(),
        seq in 1u32..10_000,
    ) {
        let quotation = format_number(&scope_for(DocumentKind::Quotation, date), seq);
        let job_scope = scope_for(DocumentKind::JobOrder, date);
        prop_assert_eq!(parse_sequence(&quotation, &job_scope), None);
    }

    #[test]
    fn totals_add_up(
        items in prop::collection::vec(item(), 1..8),
        perdiem in (price(), 0i32..10),
        transport in (price(), 0i32..10),
        rate in tax_rate(),
    ) {
        let totals = compute_totals(&items, perdiem, transport, Decimal::ZERO, rate)
            .expect("no discount never fails");

        let items_total: Decimal = items
            .iter()
            .map(|i| Decimal::from(i.quantity) * i.unit_price)
            .sum();
        prop_assert_eq!(totals.items_total, items_total);
        prop_assert!(totals.subtotal >= totals.items_total);
        prop_assert_eq!(totals.total_amount, totals.subtotal + totals.tax_amount);
        prop_assert!(totals.tax_amount >= Decimal::ZERO);
        prop_assert!(totals.tax_amount <= totals.subtotal);
        prop_assert!(totals.tax_amount.scale() <= 2);
    }

    #[test]
    fn discount_is_capped_by_subtotal(
        items in prop::collection::vec(item(), 1..4),
        extra in 1i64..1_000_000,
        rate in tax_rate(),
    ) {
        let no_charge = (Decimal::ZERO, 0);
        let subtotal = compute_totals(&items, no_charge, no_charge, Decimal::ZERO, rate)
            .expect("no discount never fails")
            .subtotal;

        let full = compute_totals(&items, no_charge, no_charge, subtotal, rate)
            .expect("discount equal to subtotal is allowed");
        prop_assert_eq!(full.total_amount, Decimal::ZERO);

        let over = subtotal + Decimal::new(extra, 2);
        prop_assert!(compute_totals(&items, no_charge, no_charge, over, rate).is_err());
    }
}
