//! Deadline sweep engine.
//!
//! This crate provides:
//! - Deadline derivation from order codes
//! - Threshold classification (`3hours`, `1hour`, `passed`)
//! - A ledger over the store's notification records
//! - The sweep orchestrator with a bounded per-user worker pool
//! - The order-creation hook and cron timing for the worker binary

pub mod deadline;
pub mod ledger;
pub mod order_created;
pub mod orchestrator;
pub mod report;
pub mod schedule;
pub mod threshold;

pub use deadline::{deadline_for, DeadlineError};
pub use ledger::Ledger;
pub use order_created::{on_order_created, OrderCreatedOutcome};
pub use orchestrator::SweepOrchestrator;
pub use report::{SweepCounts, SweepReport};
pub use threshold::classify;
