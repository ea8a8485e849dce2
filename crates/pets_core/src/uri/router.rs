//! Pet identifier routing.
//!
//! # Responsibility
//! - Build the pet routing table once for a given authority.
//! - Classify identifiers as the pet collection or a single pet.
//!
//! # Invariants
//! - The router is immutable and `Send + Sync`; classification never blocks.
//! - An item route always carries the key parsed from its last segment.

use crate::model::pet::{content_item_type, content_list_type, CONTENT_SCHEME, PATH_PETS};
use crate::uri::content_uri::ContentUri;
use crate::uri::matcher::UriMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteCode {
    Pets,
    PetId,
}

/// Classified intent of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetRoute {
    /// All pets.
    Pets,
    /// One pet, keyed by `_id`.
    PetId(i64),
}

/// Routing table for one content authority.
#[derive(Debug, Clone)]
pub struct PetRouter {
    authority: String,
    matcher: UriMatcher<RouteCode>,
}

impl PetRouter {
    pub fn new(authority: impl Into<String>) -> Self {
        let authority = authority.into();
        let matcher = UriMatcher::builder()
            .add(&authority, PATH_PETS, RouteCode::Pets)
            .add(&authority, &format!("{PATH_PETS}/#"), RouteCode::PetId)
            .build();
        Self { authority, matcher }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Identifier of the pet collection, e.g. `content://<authority>/pets`.
    pub fn collection_uri(&self) -> ContentUri {
        ContentUri::from_parts(Some(CONTENT_SCHEME), &self.authority, PATH_PETS)
    }

    /// Classifies `uri`; `None` means the identifier is not served here.
    pub fn classify(&self, uri: &ContentUri) -> Option<PetRoute> {
        match self.matcher.match_uri(uri)? {
            RouteCode::Pets => Some(PetRoute::Pets),
            RouteCode::PetId => uri.parse_id().map(PetRoute::PetId),
        }
    }

    /// MIME-equivalent tag for a classified route.
    pub fn content_type(&self, route: PetRoute) -> String {
        match route {
            PetRoute::Pets => content_list_type(&self.authority),
            PetRoute::PetId(_) => content_item_type(&self.authority),
        }
    }
}
