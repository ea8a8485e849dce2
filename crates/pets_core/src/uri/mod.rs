//! Resource identifiers and routing.
//!
//! # Responsibility
//! - Parse hierarchical content identifiers.
//! - Classify identifiers against a routing table built at construction.
//!
//! # Invariants
//! - Routing performs no I/O and holds no mutable state after build.

pub mod content_uri;
pub mod matcher;
pub mod router;
