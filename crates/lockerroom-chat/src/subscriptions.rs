//! Ownership of the live store subscriptions a chat client holds.
//!
//! The [`SubscriptionManager`] keeps at most one subscription per
//! [`SubscriptionKind`].  Attaching a kind that is already active cancels the
//! old registration first.  The store pushes events into a channel the
//! manager owns; [`SubscriptionManager::dispatch`] routes each one to the
//! listener of the kind it belongs to and drops events from registrations
//! that were cancelled or replaced in the meantime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use lockerroom_shared::{MessagingError, Result};
use lockerroom_store::{
    EventSink, MessagingStore, QueryDescriptor, Snapshot, StoreEvent, SubscriptionId,
};

/// The independent subscription slots of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// Direct threads of the current user.
    Directory,
    /// The open thread's document.
    ThreadMeta,
    /// The open thread's most recent messages.
    MessageWindow,
}

impl SubscriptionKind {
    pub const ALL: [SubscriptionKind; 3] = [Self::Directory, Self::ThreadMeta, Self::MessageWindow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::ThreadMeta => "thread-meta",
            Self::MessageWindow => "message-window",
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque token for one attachment.  A re-attach yields a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Detached,
    Active(SubscriptionHandle),
}

/// Receives the events of one attached subscription.
pub trait SubscriptionListener: Send {
    fn on_snapshot(&mut self, snapshot: Snapshot);

    /// Called once when the subscription fails.  The kind is already
    /// detached at that point.
    fn on_error(&mut self, error: MessagingError);
}

/// Adapts a pair of closures to [`SubscriptionListener`].
pub struct CallbackListener<S, E> {
    on_snapshot: S,
    on_error: E,
}

impl<S, E> CallbackListener<S, E>
where
    S: FnMut(Snapshot) + Send,
    E: FnMut(MessagingError) + Send,
{
    pub fn new(on_snapshot: S, on_error: E) -> Self {
        Self {
            on_snapshot,
            on_error,
        }
    }
}

impl<S, E> SubscriptionListener for CallbackListener<S, E>
where
    S: FnMut(Snapshot) + Send,
    E: FnMut(MessagingError) + Send,
{
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        (self.on_snapshot)(snapshot)
    }

    fn on_error(&mut self, error: MessagingError) {
        (self.on_error)(error)
    }
}

struct Slot {
    handle: SubscriptionHandle,
    subscription: SubscriptionId,
    listener: Box<dyn SubscriptionListener>,
}

pub struct SubscriptionManager {
    store: Arc<dyn MessagingStore>,
    sink: EventSink,
    events: mpsc::UnboundedReceiver<StoreEvent>,
    slots: HashMap<SubscriptionKind, Slot>,
    next_handle: u64,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn MessagingStore>) -> Self {
        let (sink, events) = mpsc::unbounded_channel();
        Self {
            store,
            sink,
            events,
            slots: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Subscribe `query` under `kind`, replacing whatever `kind` held.
    ///
    /// If the store refuses the subscription the kind stays detached and the
    /// error is returned.
    pub fn attach(
        &mut self,
        kind: SubscriptionKind,
        query: QueryDescriptor,
        listener: Box<dyn SubscriptionListener>,
    ) -> Result<SubscriptionHandle> {
        self.detach(kind);

        let subscription = self
            .store
            .subscribe(&query, self.sink.clone())
            .map_err(|e| {
                let err = MessagingError::from(e);
                warn!(kind = %kind, error = %err, "Subscribe rejected");
                err
            })?;

        self.next_handle += 1;
        let handle = SubscriptionHandle(self.next_handle);
        debug!(kind = %kind, subscription = %subscription, query = ?query, "Subscription attached");

        self.slots.insert(
            kind,
            Slot {
                handle,
                subscription,
                listener,
            },
        );
        Ok(handle)
    }

    pub fn attach_with<S, E>(
        &mut self,
        kind: SubscriptionKind,
        query: QueryDescriptor,
        on_snapshot: S,
        on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        S: FnMut(Snapshot) + Send + 'static,
        E: FnMut(MessagingError) + Send + 'static,
    {
        self.attach(kind, query, Box::new(CallbackListener::new(on_snapshot, on_error)))
    }

    /// Cancel `kind` if it is active.  Does nothing otherwise.
    pub fn detach(&mut self, kind: SubscriptionKind) {
        if let Some(slot) = self.slots.remove(&kind) {
            self.store.cancel(slot.subscription);
            debug!(kind = %kind, subscription = %slot.subscription, "Subscription detached");
        }
    }

    pub fn detach_all(&mut self) {
        for kind in SubscriptionKind::ALL {
            self.detach(kind);
        }
    }

    pub fn state(&self, kind: SubscriptionKind) -> SubscriptionState {
        match self.slots.get(&kind) {
            Some(slot) => SubscriptionState::Active(slot.handle),
            None => SubscriptionState::Detached,
        }
    }

    pub fn is_active(&self, kind: SubscriptionKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn handle(&self, kind: SubscriptionKind) -> Option<SubscriptionHandle> {
        self.slots.get(&kind).map(|slot| slot.handle)
    }

    /// Route one store event.  Returns `false` if the event was dropped
    /// because its registration is no longer current.
    pub fn dispatch(&mut self, event: StoreEvent) -> bool {
        let kind = self
            .slots
            .iter()
            .find(|(_, slot)| slot.subscription == event.subscription)
            .map(|(kind, _)| *kind);

        let Some(kind) = kind else {
            trace!(subscription = %event.subscription, "Dropping event from stale subscription");
            return false;
        };

        match event.payload {
            Ok(snapshot) => {
                if let Some(slot) = self.slots.get_mut(&kind) {
                    slot.listener.on_snapshot(snapshot);
                }
            }
            Err(e) => {
                let Some(mut slot) = self.slots.remove(&kind) else {
                    return false;
                };
                self.store.cancel(slot.subscription);

                let err = MessagingError::from(e);
                match &err {
                    MessagingError::IndexMissing { diagnostic } => error!(
                        kind = %kind,
                        diagnostic = %diagnostic,
                        "Subscription failed: composite index missing"
                    ),
                    other => error!(kind = %kind, error = %other, "Subscription failed"),
                }
                slot.listener.on_error(err);
            }
        }
        true
    }

    /// Deliver every queued event without waiting.  Returns how many reached
    /// a listener.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.dispatch(event) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Wait for the next event and dispatch it.
    ///
    /// The manager keeps a sender of its own, so the channel never closes and
    /// this only returns once an event has arrived.
    pub async fn next_event(&mut self) {
        if let Some(event) = self.events.recv().await {
            self.dispatch(event);
        }
    }
}
