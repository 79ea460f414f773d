use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect,
};
use tracing::{debug, instrument, warn};

use crate::{
    config::AppConfig,
    entities::{document_sequence, job_order, quotation, travel_order, DocumentSequence},
    errors::ServiceError,
};

/// Documents that carry a `PREFIX/YYYY/MM/NNNN` number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Quotation,
    JobOrder,
    TravelOrder,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Quotation => "QUO",
            DocumentKind::JobOrder => "JO",
            DocumentKind::TravelOrder => "TO",
        }
    }
}

/// `PREFIX/YYYY/MM/` for the month containing `date`
pub fn scope_for(kind: DocumentKind, date: NaiveDate) -> String {
    format!("{}/{:04}/{:02}/", kind.prefix(), date.year(), date.month())
}

/// Sequence suffix of `number` when it belongs to `scope`
pub fn parse_sequence(number: &str, scope: &str) -> Option<u32> {
    let suffix = number.strip_prefix(scope)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Zero-padded to four digits; wider sequences keep every digit
pub fn format_number(scope: &str, seq: u32) -> String {
    format!("{}{:04}", scope, seq)
}

/// Allocates per-month document numbers from the `document_sequences` table.
///
/// Allocation runs on the caller's connection, so when the caller passes a
/// transaction the counter bump rolls back together with a failed insert.
#[derive(Debug, Clone)]
pub struct DocumentNumberService {
    utc_offset_minutes: i32,
    max_retries: u32,
}

impl DocumentNumberService {
    pub fn new(utc_offset_minutes: i32, max_retries: u32) -> Self {
        Self {
            utc_offset_minutes,
            max_retries: max_retries.max(1),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.document_utc_offset_minutes,
            cfg.document_number_max_retries,
        )
    }

    /// Calendar date of `at` in the configured document timezone
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        (at + Duration::minutes(i64::from(self.utc_offset_minutes))).date_naive()
    }

    #[instrument(skip(self, conn))]
    pub async fn next_number<C>(
        &self,
        conn: &C,
        kind: DocumentKind,
        at: DateTime<Utc>,
    ) -> Result<String, ServiceError>
    where
        C: ConnectionTrait,
    {
        let scope = scope_for(kind, self.local_date(at));

        if DocumentSequence::find_by_id(scope.clone())
            .one(conn)
            .await?
            .is_none()
        {
            self.seed_scope(conn, kind, &scope).await?;
        }

        for attempt in 0..self.max_retries {
            let current = DocumentSequence::find_by_id(scope.clone())
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!("document sequence {} vanished", scope))
                })?;

            let next = current.last_value + 1;
            let result = DocumentSequence::update_many()
                .col_expr(document_sequence::Column::LastValue, Expr::value(next))
                .col_expr(document_sequence::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(document_sequence::Column::Scope.eq(scope.clone()))
                .filter(document_sequence::Column::LastValue.eq(current.last_value))
                .exec(conn)
                .await?;

            if result.rows_affected == 1 {
                let seq = u32::try_from(next).map_err(|_| {
                    ServiceError::InternalError(format!("sequence overflow in {}", scope))
                })?;
                let number = format_number(&scope, seq);
                debug!(number = %number, attempt, "allocated document number");
                counter!("labdesk.document_numbers.allocated", 1, "kind" => kind.prefix());
                return Ok(number);
            }

            counter!("labdesk.document_numbers.cas_retry", 1, "kind" => kind.prefix());
            debug!(scope = %scope, attempt, "document sequence moved, retrying");
        }

        warn!(scope = %scope, retries = self.max_retries, "document number allocation exhausted retries");
        Err(ServiceError::Conflict(format!(
            "could not allocate a document number in {}; try again",
            scope
        )))
    }

    /// Creates the counter row for `scope`, starting after the highest number
    /// already stored. Losing the insert race to another writer is fine.
    async fn seed_scope<C>(
        &self,
        conn: &C,
        kind: DocumentKind,
        scope: &str,
    ) -> Result<(), ServiceError>
    where
        C: ConnectionTrait,
    {
        let start = highest_existing_sequence(conn, kind, scope).await?;

        let seed = document_sequence::ActiveModel {
            scope: Set(scope.to_string()),
            last_value: Set(i64::from(start)),
            updated_at: Set(Utc::now()),
        };

        let inserted = DocumentSequence::insert(seed)
            .on_conflict(
                OnConflict::column(document_sequence::Column::Scope)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await;

        match inserted {
            Ok(_) | Err(DbErr::RecordNotInserted) => {
                debug!(scope, start, "seeded document sequence");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Numerically highest sequence already stored in `scope` for the kind's table.
///
/// Compared after parsing, so `.../10000` outranks `.../9999`.
async fn highest_existing_sequence<C>(
    conn: &C,
    kind: DocumentKind,
    scope: &str,
) -> Result<u32, DbErr>
where
    C: ConnectionTrait,
{
    let numbers: Vec<String> = match kind {
        DocumentKind::Quotation => {
            quotation::Entity::find()
                .select_only()
                .column(quotation::Column::QuotationNumber)
                .filter(quotation::Column::QuotationNumber.starts_with(scope))
                .into_tuple()
                .all(conn)
                .await?
        }
        DocumentKind::JobOrder => {
            job_order::Entity::find()
                .select_only()
                .column(job_order::Column::JobNumber)
                .filter(job_order::Column::JobNumber.starts_with(scope))
                .into_tuple()
                .all(conn)
                .await?
        }
        DocumentKind::TravelOrder => {
            travel_order::Entity::find()
                .select_only()
                .column(travel_order::Column::DocumentNumber)
                .filter(travel_order::Column::DocumentNumber.starts_with(scope))
                .into_tuple()
                .all(conn)
                .await?
        }
    };

    Ok(numbers
        .iter()
        .filter_map(|number| parse_sequence(number, scope))
        .max()
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn scope_uses_prefix_year_and_padded_month() {
        assert_eq!(
            scope_for(DocumentKind::TravelOrder, date(2024, 3, 9)),
            "TO/2024/03/"
        );
        assert_eq!(
            scope_for(DocumentKind::Quotation, date(2025, 12, 31)),
            "QUO/2025/12/"
        );
        assert_eq!(
            scope_for(DocumentKind::JobOrder, date(2025, 1, 1)),
            "JO/2025/01/"
        );
    }

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(format_number("TO/2024/03/", 1), "TO/2024/03/0001");
        assert_eq!(format_number("TO/2024/03/", 42), "TO/2024/03/0042");
        assert_eq!(format_number("TO/2024/03/", 12345), "TO/2024/03/12345");
    }

    #[test]
    fn parse_sequence_only_accepts_matching_scope() {
        assert_eq!(parse_sequence("TO/2024/03/0007", "TO/2024/03/"), Some(7));
        assert_eq!(parse_sequence("TO/2024/04/0007", "TO/2024/03/"), None);
        assert_eq!(parse_sequence("TO/2024/03/", "TO/2024/03/"), None);
        assert_eq!(parse_sequence("TO/2024/03/00a1", "TO/2024/03/"), None);
    }

    #[test]
    fn offset_can_move_the_month() {
        let at = Utc.with_ymd_and_hms(2024, 3, 31, 20, 0, 0).unwrap();
        assert_eq!(DocumentNumberService::new(0, 5).local_date(at), date(2024, 3, 31));
        assert_eq!(
            DocumentNumberService::new(7 * 60, 5).local_date(at),
            date(2024, 4, 1)
        );
    }

    #[tokio::test]
    async fn sequential_allocations_increase_within_month() {
        let db = crate::db::establish_connection("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        let service = DocumentNumberService::new(0, 5);
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();

        let first = service
            .next_number(&db, DocumentKind::TravelOrder, at)
            .await
            .unwrap();
        let second = service
            .next_number(&db, DocumentKind::TravelOrder, at)
            .await
            .unwrap();
        assert_eq!(first, "TO/2024/03/0001");
        assert_eq!(second, "TO/2024/03/0002");

        let next_month = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let april = service
            .next_number(&db, DocumentKind::TravelOrder, next_month)
            .await
            .unwrap();
        assert_eq!(april, "TO/2024/04/0001");

        let quotation = service
            .next_number(&db, DocumentKind::Quotation, at)
            .await
            .unwrap();
        assert_eq!(quotation, "QUO/2024/03/0001");
    }
}
