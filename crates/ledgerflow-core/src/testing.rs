//! Test fixtures shared by this crate's unit tests: a minimal in-memory
//! store and a counter aggregate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata};
use crate::store::{EventStore, StoredEvent};

pub(crate) const INCREMENTED_EVENT_TYPE: &str = "counter.incremented";

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    streams: Mutex<HashMap<Uuid, Vec<StoredEvent>>>,
    appends: Mutex<Vec<(Uuid, i64, usize)>>,
}

impl MemoryStore {
    pub(crate) fn appends(&self) -> Vec<(Uuid, i64, usize)> {
        self.appends.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .streams
            .lock()
            .unwrap()
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = self.streams.lock().unwrap();
        let stream = streams.entry(aggregate_id).or_default();
        let actual = stream.last().map_or(0, |e| e.sequence_number);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        self.appends
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.len()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Incremented {
    pub(crate) by: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CounterEvent {
    pub(crate) metadata: EventMetadata,
    pub(crate) kind: Incremented,
}

impl DomainEvent for CounterEvent {
    fn event_type(&self) -> &'static str {
        INCREMENTED_EVENT_TYPE
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        if stored.event_type != INCREMENTED_EVENT_TYPE {
            return Err(DomainError::UnknownEventType {
                aggregate_id: stored.aggregate_id,
                event_type: stored.event_type.clone(),
            });
        }
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind: serde_json::from_value(stored.payload.clone())?,
        })
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct Counter {
    pub(crate) id: Uuid,
    pub(crate) version: i64,
    pub(crate) total: i64,
    uncommitted_events: Vec<CounterEvent>,
}

impl Counter {
    pub(crate) fn increment(&mut self, by: i64) {
        let event = CounterEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: INCREMENTED_EVENT_TYPE.to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id: Uuid::nil(),
                causation_id: Uuid::nil(),
                occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            },
            kind: Incremented { by },
        };
        self.record(event);
    }
}

impl AggregateRoot for Counter {
    type Event = CounterEvent;

    fn empty(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            total: 0,
            uncommitted_events: Vec::new(),
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.total += event.kind.by;
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn push_uncommitted(&mut self, event: Self::Event) {
        self.uncommitted_events.push(event);
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
