//! Re-query-on-change helper for list screens.
//!
//! # Responsibility
//! - Remember one query and re-issue it only after a change signal for its
//!   identifier arrived.
//!
//! # Invariants
//! - A fresh `LiveQuery` is stale, so the first `poll` always queries.
//! - A failed re-query leaves the query stale.
//! - Dropping a `LiveQuery` removes its observer registration.

use crate::notify::notifier::{ChangeNotifier, ObserverId};
use crate::repo::selection::{Projection, Selection, SortOrder};
use crate::service::cursor::Cursor;
use crate::service::pet_provider::{ContentProvider, ProviderResult};
use crate::uri::content_uri::ContentUri;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct LiveQuery {
    uri: ContentUri,
    projection: Projection,
    selection: Selection,
    order: SortOrder,
    stale: Arc<AtomicBool>,
    notifier: Arc<ChangeNotifier>,
    observer_id: ObserverId,
}

impl LiveQuery {
    pub fn new(
        notifier: Arc<ChangeNotifier>,
        uri: ContentUri,
        projection: Projection,
        selection: Selection,
        order: SortOrder,
    ) -> Self {
        let stale = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&stale);
        let observer_id = notifier.subscribe(&uri, move |_: &ContentUri| {
            flag.store(true, Ordering::SeqCst);
        });

        Self {
            uri,
            projection,
            selection,
            order,
            stale,
            notifier,
            observer_id,
        }
    }

    pub fn uri(&self) -> &ContentUri {
        &self.uri
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Re-runs the query when a change was signalled since the last poll.
    ///
    /// Returns `Ok(None)` when the previous result is still current.
    pub fn poll<P>(&self, provider: &P) -> ProviderResult<Option<Cursor>>
    where
        P: ContentProvider + ?Sized,
    {
        if !self.stale.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }

        match provider.query(&self.uri, &self.projection, &self.selection, &self.order) {
            Ok(cursor) => Ok(Some(cursor)),
            Err(err) => {
                self.stale.store(true, Ordering::SeqCst);
                Err(err)
            }
        }
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.notifier.unsubscribe(self.observer_id);
    }
}
