//! Core use-case services.
//!
//! # Responsibility
//! - Expose the identifier-addressed access layer to callers.
//! - Keep callers decoupled from routing, validation and storage details.

pub mod cursor;
pub mod live_query;
pub mod pet_provider;
