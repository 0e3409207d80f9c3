//! Domain model for genome metadata and domain statistics records.
//!
//! # Responsibility
//! - Define the typed records loaders stage and repositories persist.
//! - Define the composite natural keys used for reconciliation.
//!
//! # Invariants
//! - Every record is identified by its natural key; `id` is storage-assigned.
//! - Choice-typed columns only ever hold values of their enum.

pub mod choices;
pub mod decimal;
pub mod genome;
pub mod keys;
pub mod stats;
