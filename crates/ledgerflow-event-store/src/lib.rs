//! Ledgerflow Event Store: implementations of the `EventStore` contract.

pub mod in_memory;
pub mod pg_event_store;
pub mod schema;

pub use in_memory::InMemoryEventStore;
pub use pg_event_store::PgEventStore;
