//! Ledgerflow Core: event-sourcing persistence and command dispatch.
//!
//! This crate defines the event store contract, aggregate replay, the
//! aggregate repository, the transaction manager, and the command and event
//! buses. It contains no storage backend.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod command_bus;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod repository;
pub mod store;
pub mod transaction;

#[cfg(test)]
mod testing;
