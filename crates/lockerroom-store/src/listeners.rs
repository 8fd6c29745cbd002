//! Live-query bookkeeping shared by the store backends.
//!
//! The registry maps subscription ids to their query and sink.  Backends
//! call [`ListenerRegistry::notify`] after every write; the registry works out
//! which queries the write touches and asks the backend for a fresh snapshot
//! of each.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::error::Result;
use crate::query::{Change, EventSink, QueryDescriptor, Snapshot, StoreEvent, SubscriptionId};

struct Listener {
    query: QueryDescriptor,
    sink: EventSink,
}

pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<SubscriptionId, Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Register a listener and push its first result.
    ///
    /// A failed first result is delivered as an error event and the listener
    /// is not kept.
    pub fn register(
        &self,
        query: QueryDescriptor,
        sink: EventSink,
        initial: Result<Snapshot>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let failed = initial.is_err();

        if sink
            .send(StoreEvent {
                subscription: id,
                payload: initial,
            })
            .is_err()
        {
            debug!(subscription = %id, "Subscriber gone before first snapshot");
            return id;
        }

        if failed {
            debug!(subscription = %id, kind = ?query.kind(), "Subscription failed on first snapshot");
            return id;
        }

        debug!(subscription = %id, kind = ?query.kind(), "Listener registered");
        self.lock().insert(id, Listener { query, sink });
        id
    }

    /// Remove a listener.  Returns `false` if it was not registered.
    pub fn cancel(&self, id: SubscriptionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(subscription = %id, "Listener cancelled");
        } else {
            trace!(subscription = %id, "Cancel for unknown listener ignored");
        }
        removed
    }

    /// Push a fresh snapshot to every listener whose query `change` touches.
    ///
    /// Listeners whose sink is closed, or whose snapshot fails, are dropped.
    pub fn notify<F>(&self, change: Change<'_>, mut snapshot: F)
    where
        F: FnMut(&QueryDescriptor) -> Result<Snapshot>,
    {
        let targets: Vec<(SubscriptionId, QueryDescriptor, EventSink)> = self
            .lock()
            .iter()
            .filter(|(_, listener)| listener.query.is_affected_by(&change))
            .map(|(id, listener)| (*id, listener.query.clone(), listener.sink.clone()))
            .collect();

        for (id, query, sink) in targets {
            let payload = snapshot(&query);
            let failed = payload.is_err();
            let sent = sink
                .send(StoreEvent {
                    subscription: id,
                    payload,
                })
                .is_ok();

            if !sent || failed {
                self.cancel(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
