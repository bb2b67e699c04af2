//! Airmail back-office domain core.
//!
//! Holds the cargo record model and the rule engines that assign customers
//! and billing rates to cargo records. Nothing in this crate talks to a
//! database or HTTP directly; persistence is reached through the
//! collaborator traits in [`store`].

pub mod cargo;
pub mod compiler;
pub mod condition;
pub mod customer_code;
pub mod error;
pub mod execution;
pub mod matcher;
pub mod rate;
pub mod resolver;
pub mod rule;
pub mod store;
pub mod types;
