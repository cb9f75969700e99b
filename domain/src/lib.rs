//! This module re-exports various items from the `entity_api` crate.
//!
//! The purpose of this re-export is to ensure that consumers of the `domain` crate do not need to
//! directly depend on the `entity_api` crate. By re-exporting these items, we provide a clear and
//! consistent interface for working with log records and query filters within the domain layer,
//! while the underlying implementation details remain in the `entity_api` crate.
pub use entity_api::query::{IntoQueryFilterMap, QueryFilterMap};

// Re-exports from `entity` crate via `entity_api`
pub use entity_api::{log_records, Id};

/// One log entry as stored and transmitted. Immutable once constructed.
pub type Record = log_records::Model;

pub use filter::Filter;

pub mod error;
pub mod filter;
pub mod log_record;
