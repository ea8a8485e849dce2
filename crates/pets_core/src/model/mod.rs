//! Pet domain model.
//!
//! # Responsibility
//! - Describe the single pet record type: columns, legal values, read model.
//! - Own the write-path validation rules.
//!
//! # Invariants
//! - Every persisted pet is identified by an engine-assigned `_id`.
//! - Deletion is physical; there are no tombstones.

pub mod pet;
pub mod validation;
pub mod values;
