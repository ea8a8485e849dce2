//! Persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the storage engine contract the access layer issues calls
//!   against.
//! - Isolate SQLite statement details from routing and validation.
//!
//! # Invariants
//! - Only the access layer calls into this module on behalf of callers.

pub mod selection;
pub mod storage;
