//! Domain core: sale/order types, the FC and DOL adapter traits, the
//! admission pipeline, and admin/reconciliation procedures.
//!
//! Nothing in this module knows about HTTP, env vars, or the process
//! lifecycle — those live in [`crate::gateway`], [`crate::config`], and
//! [`crate::logging`] respectively.

pub mod admin;
pub mod durable_log;
pub mod error;
pub mod fast_coordinator;
pub mod pipeline;
pub mod types;

pub use admin::AdminOps;
pub use durable_log::{DurableOrderLog, InMemoryOrderLog, PostgresOrderLog};
pub use error::PurchaseError;
pub use fast_coordinator::{FastCoordinator, InMemoryCoordinator};
pub use pipeline::{AdmissionPipeline, PurchaseResult};
