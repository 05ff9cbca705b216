//! Ledgerflow: Account bounded context.
//!
//! A bank account with a fixed debt limit, persisted as an event stream.

pub mod application;
pub mod domain;
