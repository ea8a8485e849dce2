//! Change notification for content identifiers.
//!
//! # Responsibility
//! - Let observers learn that data under an identifier changed without
//!   polling storage.
//!
//! # Invariants
//! - Signals carry no row data; observers re-query to see the new state.

pub mod notifier;
