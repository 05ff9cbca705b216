//! Shared test doubles for Ledgerflow.

mod clock;
mod store;

pub use clock::FixedClock;
pub use store::{ConflictingEventStore, EmptyEventStore, FailingEventStore, RecordingEventStore};
