//! Application layer: command handlers, queries, subscribers and bus wiring.

pub mod command_handlers;
pub mod query_handlers;
pub mod routing;
pub mod subscribers;
