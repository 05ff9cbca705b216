//! `PostgreSQL` implementation of the `EventStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ledgerflow_core::error::DomainError;
use ledgerflow_core::store::{EventStore, StoredEvent, ensure_contiguous};

const UNIQUE_VIOLATION: &str = "23505";

/// Name of the `UNIQUE (aggregate_id, sequence_number)` constraint.
const STREAM_POSITION_CONSTRAINT: &str = "domain_events_stream_position";

const SELECT_STREAM: &str = r"
SELECT event_id, aggregate_id, event_type, payload, sequence_number,
       correlation_id, causation_id, occurred_at
FROM domain_events
WHERE aggregate_id = $1
ORDER BY sequence_number ASC
";

const SELECT_VERSION: &str =
    "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1";

const INSERT_EVENT: &str = r"
INSERT INTO domain_events (
    event_id, aggregate_id, event_type, payload, sequence_number,
    correlation_id, causation_id, occurred_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
";

/// Row shape of `domain_events`.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    sequence_number: i64,
    correlation_id: Uuid,
    causation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            sequence_number: row.sequence_number,
            correlation_id: row.correlation_id,
            causation_id: row.causation_id,
            occurred_at: row.occurred_at,
        }
    }
}

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn infrastructure(err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("event store query failed: {err}"))
}

/// Only a clash on the stream position is a lost race; a duplicate event id
/// is an integrity error.
fn is_position_violation(code: Option<&str>, constraint: Option<&str>) -> bool {
    code == Some(UNIQUE_VIOLATION) && constraint == Some(STREAM_POSITION_CONSTRAINT)
}

fn is_stream_position_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| is_position_violation(db.code().as_deref(), db.constraint()))
}

#[async_trait]
impl EventStore for PgEventStore {
    #[tracing::instrument(skip(self))]
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query_as::<_, EventRow>(SELECT_STREAM)
            .bind(aggregate_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| infrastructure(&err))?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    #[tracing::instrument(skip(self, events), fields(events = events.len()))]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        ensure_contiguous(aggregate_id, expected_version, events)?;

        let mut tx = self.pool.begin().await.map_err(|err| infrastructure(&err))?;

        let actual = sqlx::query_scalar::<_, i64>(SELECT_VERSION)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| infrastructure(&err))?;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            let inserted = sqlx::query(INSERT_EVENT)
                .bind(event.event_id)
                .bind(event.aggregate_id)
                .bind(&event.event_type)
                .bind(&event.payload)
                .bind(event.sequence_number)
                .bind(event.correlation_id)
                .bind(event.causation_id)
                .bind(event.occurred_at)
                .execute(&mut *tx)
                .await;
            if let Err(err) = inserted {
                if is_stream_position_conflict(&err) {
                    // A racing writer committed between our read and insert.
                    drop(tx);
                    let actual = self.stream_version(aggregate_id).await?;
                    tracing::debug!(%aggregate_id, actual, "append lost race");
                    return Err(DomainError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual,
                    });
                }
                return Err(infrastructure(&err));
            }
        }

        tx.commit().await.map_err(|err| infrastructure(&err))?;
        Ok(())
    }

    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>(SELECT_VERSION)
            .bind(aggregate_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| infrastructure(&err))
    }
}
