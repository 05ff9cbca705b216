//! Transaction manager: stages one command's appends and commits them to
//! the shared store as a single unit, or discards them.
//!
//! A [`Transaction`] is itself an [`EventStore`]: repositories built on it
//! see their own staged writes, while nothing reaches the shared store
//! until [`Transaction::commit`]. Dropping a transaction without committing
//! is a rollback.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::store::{EventStore, StoredEvent, ensure_contiguous};

/// Opens transactions over the shared event store.
#[derive(Clone)]
pub struct TransactionManager {
    store: Arc<dyn EventStore>,
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager").finish_non_exhaustive()
    }
}

impl TransactionManager {
    /// Creates a transaction manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Opens a new transaction.
    #[must_use]
    pub fn begin(&self) -> Transaction {
        let transaction = Transaction {
            id: Uuid::new_v4(),
            store: Arc::clone(&self.store),
            staged: Mutex::new(None),
        };
        tracing::trace!(transaction_id = %transaction.id, "transaction opened");
        transaction
    }

    /// The shared store transactions commit into.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }
}

/// Events staged for a single aggregate.
#[derive(Debug)]
struct StagedAppend {
    aggregate_id: Uuid,
    /// Stream version observed when the first append was staged.
    base_version: i64,
    events: Vec<StoredEvent>,
}

impl StagedAppend {
    #[allow(clippy::cast_possible_wrap)]
    fn version(&self) -> i64 {
        self.base_version + self.events.len() as i64
    }
}

/// An open unit of work bound to at most one aggregate.
pub struct Transaction {
    id: Uuid,
    store: Arc<dyn EventStore>,
    staged: Mutex<Option<StagedAppend>>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Transaction identifier, for logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<StagedAppend>>, DomainError> {
        self.staged
            .lock()
            .map_err(|_| DomainError::Infrastructure("transaction state poisoned".into()))
    }

    /// Writes the staged events to the shared store in one append, at the
    /// version observed when they were staged. Returns the committed events
    /// in recorded order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if another writer appended
    /// to the stream after it was read; nothing is written in that case.
    pub async fn commit(self) -> Result<Vec<StoredEvent>, DomainError> {
        let staged = self
            .staged
            .into_inner()
            .map_err(|_| DomainError::Infrastructure("transaction state poisoned".into()))?;
        let Some(staged) = staged else {
            tracing::debug!(transaction_id = %self.id, "transaction committed with no events");
            return Ok(Vec::new());
        };

        self.store
            .append_events(staged.aggregate_id, staged.base_version, &staged.events)
            .await?;
        tracing::debug!(
            transaction_id = %self.id,
            aggregate_id = %staged.aggregate_id,
            events = staged.events.len(),
            "transaction committed"
        );
        Ok(staged.events)
    }

    /// Discards every staged event.
    pub fn rollback(self) {
        let discarded = self
            .staged
            .into_inner()
            .ok()
            .flatten()
            .map_or(0, |staged| staged.events.len());
        tracing::debug!(transaction_id = %self.id, discarded, "transaction rolled back");
    }
}

/// Stages `events` on top of `staged`, which must already be bound to
/// `aggregate_id`.
fn stage_onto(
    staged: &mut StagedAppend,
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    if staged.aggregate_id != aggregate_id {
        return Err(DomainError::TransactionScope {
            bound: staged.aggregate_id,
            attempted: aggregate_id,
        });
    }
    let actual = staged.version();
    if actual != expected_version {
        return Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected: expected_version,
            actual,
        });
    }
    ensure_contiguous(aggregate_id, expected_version, events)?;
    staged.events.extend_from_slice(events);
    Ok(())
}

#[async_trait]
impl EventStore for Transaction {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let mut events = self.store.load_events(aggregate_id).await?;
        let staged = self.lock()?;
        if let Some(staged) = staged.as_ref().filter(|s| s.aggregate_id == aggregate_id) {
            events.retain(|event| event.sequence_number <= staged.base_version);
            events.extend(staged.events.iter().cloned());
        }
        Ok(events)
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        {
            let mut staged = self.lock()?;
            if let Some(staged) = staged.as_mut() {
                return stage_onto(staged, aggregate_id, expected_version, events);
            }
        }

        // First write in this transaction: check against the shared store.
        let actual = self.store.stream_version(aggregate_id).await?;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        ensure_contiguous(aggregate_id, expected_version, events)?;

        let mut staged = self.lock()?;
        match staged.as_mut() {
            Some(existing) => stage_onto(existing, aggregate_id, expected_version, events),
            None => {
                *staged = Some(StagedAppend {
                    aggregate_id,
                    base_version: expected_version,
                    events: events.to_vec(),
                });
                Ok(())
            }
        }
    }

    async fn stream_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        {
            let staged = self.lock()?;
            if let Some(staged) = staged.as_ref().filter(|s| s.aggregate_id == aggregate_id) {
                return Ok(staged.version());
            }
        }
        self.store.stream_version(aggregate_id).await
    }
}
