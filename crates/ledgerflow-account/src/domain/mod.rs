//! Domain layer: aggregate, events, commands, value objects and rule errors.

pub mod aggregates;
pub mod commands;
pub mod errors;
pub mod events;
pub mod money;
