//! Status machines for quotations, job orders and sampling assignments.
//!
//! Everything here is pure: callers load the current rows, ask for the next
//! state, and write the result inside their own transaction.

use thiserror::Error;

use crate::entities::{JobOrderStatus, QuotationStatus, SamplingStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move {entity} from '{from}' to '{to}'")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
}

impl TransitionError {
    fn illegal(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        Self::IllegalTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Outcome of a sampling status change, including the mirrored job order state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingTransition {
    pub assignment: SamplingStatus,
    /// New job order status, `None` when the job order is left alone
    pub job_order: Option<JobOrderStatus>,
    /// Whether the completion timestamp should be written
    pub stamp_actual_date: bool,
}

impl SamplingTransition {
    /// True when applying this transition changes nothing
    pub fn is_noop(&self, current_assignment: SamplingStatus, current_job: JobOrderStatus) -> bool {
        self.assignment == current_assignment
            && self.job_order.map_or(true, |status| status == current_job)
            && !self.stamp_actual_date
    }
}

pub fn sampling_move_allowed(from: SamplingStatus, to: SamplingStatus) -> bool {
    use SamplingStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Completed)
            | (Pending, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Cancelled)
    )
}

/// Job order status implied by an assignment entering `status`
pub fn mirrored_job_status(status: SamplingStatus) -> Option<JobOrderStatus> {
    match status {
        SamplingStatus::InProgress => Some(JobOrderStatus::Sampling),
        SamplingStatus::Completed => Some(JobOrderStatus::Analysis),
        SamplingStatus::Pending | SamplingStatus::Cancelled => None,
    }
}

/// Computes the assignment and job order states after moving the assignment
/// to `target`. Re-applying the current status is accepted and changes nothing.
pub fn sampling_transition(
    current_assignment: SamplingStatus,
    current_job: JobOrderStatus,
    target: SamplingStatus,
) -> Result<SamplingTransition, TransitionError> {
    if current_assignment == target {
        return Ok(SamplingTransition {
            assignment: target,
            job_order: None,
            stamp_actual_date: false,
        });
    }

    if !sampling_move_allowed(current_assignment, target) {
        return Err(TransitionError::illegal(
            "sampling assignment",
            current_assignment,
            target,
        ));
    }

    let job_order = mirrored_job_status(target).filter(|status| *status != current_job);

    Ok(SamplingTransition {
        assignment: target,
        job_order,
        stamp_actual_date: target == SamplingStatus::Completed,
    })
}

pub fn quotation_move_allowed(from: QuotationStatus, to: QuotationStatus) -> bool {
    use QuotationStatus::*;
    matches!(
        (from, to),
        (Draft, Sent)
            | (Draft, Rejected)
            | (Sent, Accepted)
            | (Sent, Rejected)
            | (Sent, Draft)
            | (Accepted, Paid)
            | (Accepted, Completed)
            | (Paid, Completed)
            | (Rejected, Draft)
    )
}

pub fn quotation_transition(
    current: QuotationStatus,
    target: QuotationStatus,
) -> Result<QuotationStatus, TransitionError> {
    if current == target || quotation_move_allowed(current, target) {
        Ok(target)
    } else {
        Err(TransitionError::illegal("quotation", current, target))
    }
}

fn job_order_rank(status: JobOrderStatus) -> u8 {
    match status {
        JobOrderStatus::Scheduled => 0,
        JobOrderStatus::Sampling => 1,
        JobOrderStatus::Analysis => 2,
        JobOrderStatus::Reporting => 3,
        JobOrderStatus::Completed => 4,
    }
}

/// Direct job order updates advance exactly one stage at a time
pub fn job_order_transition(
    current: JobOrderStatus,
    target: JobOrderStatus,
) -> Result<JobOrderStatus, TransitionError> {
    if current == target || job_order_rank(target) == job_order_rank(current) + 1 {
        Ok(target)
    } else {
        Err(TransitionError::illegal("job order", current, target))
    }
}

/// A new sampling assignment always puts its job order into sampling
pub fn assignment_created_job_status(_current_job: JobOrderStatus) -> JobOrderStatus {
    JobOrderStatus::Sampling
}

/// Quotation status to write when its job order completes, if any
pub fn quotation_on_job_completed(current: QuotationStatus) -> Option<QuotationStatus> {
    match current {
        QuotationStatus::Accepted | QuotationStatus::Paid => Some(QuotationStatus::Completed),
        _ => None,
    }
}

/// Quotations a job order may be opened from
pub fn quotation_accepts_job_order(status: QuotationStatus) -> bool {
    matches!(status, QuotationStatus::Accepted | QuotationStatus::Paid)
}

/// Quotations that may still be deleted
pub fn quotation_is_deletable(status: QuotationStatus) -> bool {
    matches!(status, QuotationStatus::Draft | QuotationStatus::Rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sea_orm::Iterable;

    #[test]
    fn completing_moves_job_to_analysis_and_stamps_date() {
        let t = sampling_transition(
            SamplingStatus::InProgress,
            JobOrderStatus::Sampling,
            SamplingStatus::Completed,
        )
        .unwrap();

        assert_eq!(t.assignment, SamplingStatus::Completed);
        assert_eq!(t.job_order, Some(JobOrderStatus::Analysis));
        assert!(t.stamp_actual_date);
    }

    #[test]
    fn starting_moves_job_to_sampling() {
        let t = sampling_transition(
            SamplingStatus::Pending,
            JobOrderStatus::Scheduled,
            SamplingStatus::InProgress,
        )
        .unwrap();

        assert_eq!(t.job_order, Some(JobOrderStatus::Sampling));
        assert!(!t.stamp_actual_date);
    }

    #[test]
    fn starting_when_job_already_sampling_leaves_job_untouched() {
        let t = sampling_transition(
            SamplingStatus::Pending,
            JobOrderStatus::Sampling,
            SamplingStatus::InProgress,
        )
        .unwrap();

        assert_eq!(t.job_order, None);
    }

    #[test]
    fn cancelling_leaves_job_untouched() {
        let t = sampling_transition(
            SamplingStatus::InProgress,
            JobOrderStatus::Sampling,
            SamplingStatus::Cancelled,
        )
        .unwrap();

        assert_eq!(t.assignment, SamplingStatus::Cancelled);
        assert_eq!(t.job_order, None);
        assert!(!t.stamp_actual_date);
    }

    #[rstest]
    #[case(SamplingStatus::Completed, SamplingStatus::Pending)]
    #[case(SamplingStatus::Completed, SamplingStatus::InProgress)]
    #[case(SamplingStatus::Completed, SamplingStatus::Cancelled)]
    #[case(SamplingStatus::Cancelled, SamplingStatus::Pending)]
    #[case(SamplingStatus::Cancelled, SamplingStatus::Completed)]
    #[case(SamplingStatus::InProgress, SamplingStatus::Pending)]
    fn illegal_sampling_moves_are_rejected(
        #[case] from: SamplingStatus,
        #[case] to: SamplingStatus,
    ) {
        let err = sampling_transition(from, JobOrderStatus::Analysis, to).unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalTransition {
                entity: "sampling assignment",
                from: from.to_string(),
                to: to.to_string(),
            }
        );
    }

    #[test]
    fn reapplying_status_is_noop() {
        for status in SamplingStatus::iter() {
            let t = sampling_transition(status, JobOrderStatus::Analysis, status).unwrap();
            assert!(t.is_noop(status, JobOrderStatus::Analysis));
        }
    }

    #[rstest]
    #[case(QuotationStatus::Draft, QuotationStatus::Sent, true)]
    #[case(QuotationStatus::Sent, QuotationStatus::Accepted, true)]
    #[case(QuotationStatus::Accepted, QuotationStatus::Paid, true)]
    #[case(QuotationStatus::Paid, QuotationStatus::Completed, true)]
    #[case(QuotationStatus::Rejected, QuotationStatus::Draft, true)]
    #[case(QuotationStatus::Draft, QuotationStatus::Paid, false)]
    #[case(QuotationStatus::Completed, QuotationStatus::Draft, false)]
    #[case(QuotationStatus::Paid, QuotationStatus::Rejected, false)]
    fn quotation_moves(
        #[case] from: QuotationStatus,
        #[case] to: QuotationStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(quotation_transition(from, to).is_ok(), allowed);
    }

    #[test]
    fn job_orders_advance_one_stage_at_a_time() {
        assert!(job_order_transition(JobOrderStatus::Analysis, JobOrderStatus::Reporting).is_ok());
        assert!(job_order_transition(JobOrderStatus::Reporting, JobOrderStatus::Completed).is_ok());
        assert!(job_order_transition(JobOrderStatus::Scheduled, JobOrderStatus::Analysis).is_err());
        assert!(job_order_transition(JobOrderStatus::Completed, JobOrderStatus::Reporting).is_err());
        assert!(job_order_transition(JobOrderStatus::Sampling, JobOrderStatus::Sampling).is_ok());
    }

    #[test]
    fn new_assignment_always_means_sampling() {
        for status in JobOrderStatus::iter() {
            assert_eq!(
                assignment_created_job_status(status),
                JobOrderStatus::Sampling
            );
        }
    }

    #[test]
    fn job_completion_closes_accepted_or_paid_quotations() {
        assert_eq!(
            quotation_on_job_completed(QuotationStatus::Paid),
            Some(QuotationStatus::Completed)
        );
        assert_eq!(
            quotation_on_job_completed(QuotationStatus::Accepted),
            Some(QuotationStatus::Completed)
        );
        assert_eq!(quotation_on_job_completed(QuotationStatus::Completed), None);
    }
}
