//! Process-wide change notification registry.
//!
//! # Responsibility
//! - Register observers against content identifiers.
//! - Fan a change signal out to every observer whose identifier overlaps
//!   the changed one.
//!
//! # Invariants
//! - `notify` never waits for observers; delivery runs on the dispatcher
//!   thread in the order signals were issued.
//! - An observer panic is caught and logged; it never reaches the caller of
//!   `notify` and never stops delivery to other observers.
//! - Matching is segment-wise over the identifier hierarchy, not a raw
//!   string prefix.

use crate::uri::content_uri::ContentUri;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};

static SHARED_NOTIFIER: Lazy<Arc<ChangeNotifier>> = Lazy::new(|| Arc::new(ChangeNotifier::new()));

/// Receiver of "data under this identifier may have changed" signals.
pub trait ChangeObserver: Send + Sync + 'static {
    fn on_change(&self, uri: &ContentUri);
}

impl<F> ChangeObserver for F
where
    F: Fn(&ContentUri) + Send + Sync + 'static,
{
    fn on_change(&self, uri: &ContentUri) {
        self(uri)
    }
}

/// Observer that forwards every signal into an `mpsc` channel.
pub struct ChannelObserver {
    sender: Mutex<Sender<ContentUri>>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<ContentUri>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl ChangeObserver for ChannelObserver {
    fn on_change(&self, uri: &ContentUri) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        // Receiver gone means nobody listens anymore.
        let _ = sender.send(uri.clone());
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl Display for ObserverId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Registration {
    id: ObserverId,
    uri: ContentUri,
    notify_for_descendants: bool,
    observer: Arc<dyn ChangeObserver>,
}

impl Registration {
    fn wants(&self, changed: &ContentUri) -> bool {
        self.uri.same_resource(changed)
            || (self.notify_for_descendants && self.uri.is_ancestor_of(changed))
            || changed.is_ancestor_of(&self.uri)
    }
}

type Delivery = (ObserverId, Arc<dyn ChangeObserver>);

enum Dispatch {
    Change {
        uri: ContentUri,
        observers: Vec<Delivery>,
    },
    Flush(Sender<()>),
}

/// Registry of change observers keyed by content identifier.
pub struct ChangeNotifier {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    dispatcher: Option<Mutex<Sender<Dispatch>>>,
    dispatcher_thread: Option<ThreadId>,
}

impl ChangeNotifier {
    /// Creates a notifier with its own dispatcher thread.
    ///
    /// Falls back to inline delivery when the thread cannot be spawned.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<Dispatch>();
        let spawned = thread::Builder::new()
            .name("pets-change-dispatch".to_string())
            .spawn(move || run_dispatcher(receiver));

        let (dispatcher, dispatcher_thread) = match spawned {
            Ok(handle) => (Some(Mutex::new(sender)), Some(handle.thread().id())),
            Err(err) => {
                error!(
                    "event=notifier_init module=notify status=error error_code=dispatcher_spawn_failed error={}",
                    err
                );
                (None, None)
            }
        };

        Self {
            registrations: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            dispatcher,
            dispatcher_thread,
        }
    }

    /// Returns the process-wide notifier.
    pub fn shared() -> Arc<ChangeNotifier> {
        Arc::clone(&SHARED_NOTIFIER)
    }

    /// Observes `uri` and everything below it.
    pub fn subscribe<O: ChangeObserver>(&self, uri: &ContentUri, observer: O) -> ObserverId {
        self.register(uri, true, Arc::new(observer))
    }

    /// Observes `uri` itself (and its ancestors), but not its descendants.
    pub fn subscribe_exact<O: ChangeObserver>(&self, uri: &ContentUri, observer: O) -> ObserverId {
        self.register(uri, false, Arc::new(observer))
    }

    /// Removes one registration. Returns `false` for an unknown id.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = registrations.len();
        registrations.retain(|registration| registration.id != id);
        before != registrations.len()
    }

    pub fn observer_count(&self) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Signals that data under `uri` may have changed.
    ///
    /// Returns the number of observers the signal was queued for.
    pub fn notify(&self, uri: &ContentUri) -> usize {
        let observers = {
            let registrations = self
                .registrations
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            registrations
                .iter()
                .filter(|registration| registration.wants(uri))
                .map(|registration| (registration.id, Arc::clone(&registration.observer)))
                .collect::<Vec<_>>()
        };

        let count = observers.len();
        debug!("event=change_notify module=notify status=queued uri={uri} observers={count}");
        if count == 0 {
            return 0;
        }

        let dispatch = Dispatch::Change {
            uri: uri.clone(),
            observers,
        };
        if let Err(mpsc::SendError(undelivered)) = self.send(dispatch) {
            deliver(undelivered);
        }
        count
    }

    /// Blocks until every signal issued before this call was delivered.
    ///
    /// Called from an observer, returns at once: the dispatcher delivers in
    /// order, so every earlier signal is already out.
    pub fn flush(&self) {
        if self.dispatcher_thread == Some(thread::current().id()) {
            return;
        }
        let (ack_sender, ack_receiver) = mpsc::channel();
        if self.send(Dispatch::Flush(ack_sender)).is_ok() {
            // A dead dispatcher drops the ack sender, which ends the wait.
            let _ = ack_receiver.recv();
        }
    }

    fn register(
        &self,
        uri: &ContentUri,
        notify_for_descendants: bool,
        observer: Arc<dyn ChangeObserver>,
    ) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                id,
                uri: uri.clone(),
                notify_for_descendants,
                observer,
            });
        debug!("event=observer_subscribe module=notify status=ok uri={uri} observer_id={id}");
        id
    }

    fn send(&self, dispatch: Dispatch) -> Result<(), mpsc::SendError<Dispatch>> {
        match &self.dispatcher {
            Some(sender) => sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .send(dispatch),
            None => Err(mpsc::SendError(dispatch)),
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn run_dispatcher(receiver: Receiver<Dispatch>) {
    while let Ok(dispatch) = receiver.recv() {
        deliver(dispatch);
    }
}

fn deliver(dispatch: Dispatch) {
    match dispatch {
        Dispatch::Change { uri, observers } => {
            for (id, observer) in observers {
                if catch_unwind(AssertUnwindSafe(|| observer.on_change(&uri))).is_err() {
                    warn!(
                        "event=observer_panic module=notify status=error uri={} observer_id={}",
                        uri, id
                    );
                }
            }
        }
        Dispatch::Flush(ack) => {
            let _ = ack.send(());
        }
    }
}
