//! In-process realtime store.
//!
//! Holds threads and message logs in memory and pushes snapshots through the
//! shared [`ListenerRegistry`].  Faults can be queued per query kind or per
//! write kind; each queued fault is consumed by the next matching call.  A
//! query fault is either delivered as the subscription's first event or
//! returned by the subscribe call itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use lockerroom_shared::{ThreadId, ThreadKind, UserId};

use crate::contract::MessagingStore;
use crate::database::store_now;
use crate::error::{Result, StoreError};
use crate::listeners::ListenerRegistry;
use crate::models::{Message, MessageId, NewMessage, SummaryUpdate, Thread};
use crate::query::{Change, EventSink, QueryDescriptor, QueryKind, Snapshot, SubscriptionId};

/// Write operations that accept an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    CreateThread,
    AppendMessage,
    UpdateSummary,
}

#[derive(Default)]
struct Documents {
    threads: HashMap<ThreadId, Thread>,
    messages: HashMap<ThreadId, Vec<Message>>,
}

#[derive(Default)]
struct Faults {
    queries: HashMap<QueryKind, StoreError>,
    refusals: HashMap<QueryKind, StoreError>,
    writes: HashMap<WriteKind, StoreError>,
}

pub struct MemoryStore {
    documents: Mutex<Documents>,
    faults: Mutex<Faults>,
    listeners: ListenerRegistry,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(Documents::default()),
            faults: Mutex::new(Faults::default()),
            listeners: ListenerRegistry::new(),
            writes: AtomicUsize::new(0),
        }
    }

    /// Insert a thread as-is, bypassing write accounting and listeners.
    pub fn seed_thread(&self, thread: Thread) {
        self.documents().threads.insert(thread.id.clone(), thread);
    }

    /// Make the next subscription of `kind` fail with `error`.
    pub fn fail_next_subscribe(&self, kind: QueryKind, error: StoreError) {
        self.faults_guard().queries.insert(kind, error);
    }

    /// Make the next subscribe call of `kind` return `error` without
    /// registering anything.
    pub fn refuse_next_subscribe(&self, kind: QueryKind, error: StoreError) {
        self.faults_guard().refusals.insert(kind, error);
    }

    /// Make the next write of `kind` fail with `error`.
    pub fn fail_next_write(&self, kind: WriteKind, error: StoreError) {
        self.faults_guard().writes.insert(kind, error);
    }

    /// Number of write calls that reached the store, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn thread(&self, id: &ThreadId) -> Option<Thread> {
        self.documents().threads.get(id).cloned()
    }

    /// Full message log of a thread, oldest first.
    pub fn messages(&self, id: &ThreadId) -> Vec<Message> {
        self.documents().messages.get(id).cloned().unwrap_or_default()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.listeners.len()
    }

    fn snapshot(&self, query: &QueryDescriptor) -> Result<Snapshot> {
        let docs = self.documents();
        let snapshot = match query {
            QueryDescriptor::Thread(id) => Snapshot::Thread {
                id: id.clone(),
                thread: docs.threads.get(id).cloned(),
            },
            QueryDescriptor::ThreadsByParticipant(user) => {
                let mut threads: Vec<Thread> = docs
                    .threads
                    .values()
                    .filter(|t| t.kind == ThreadKind::Direct && t.has_participant(user))
                    .cloned()
                    .collect();
                threads.sort_by(|a, b| {
                    b.last_timestamp
                        .cmp(&a.last_timestamp)
                        .then_with(|| a.id.cmp(&b.id))
                });
                Snapshot::Threads(threads)
            }
            QueryDescriptor::Messages { thread_id, limit } => {
                let log = docs.messages.get(thread_id).map(Vec::as_slice).unwrap_or(&[]);
                let start = log.len().saturating_sub(*limit);
                Snapshot::Messages {
                    thread_id: thread_id.clone(),
                    messages: log[start..].to_vec(),
                }
            }
        };
        Ok(snapshot)
    }

    fn register(&self, query: QueryDescriptor, sink: EventSink) -> Result<SubscriptionId> {
        let injected = {
            let mut faults = self.faults_guard();
            if let Some(err) = faults.refusals.remove(&query.kind()) {
                debug!(kind = ?query.kind(), error = %err, "Subscribe refused");
                return Err(err);
            }
            faults.queries.remove(&query.kind())
        };

        let initial = match injected {
            Some(err) => Err(err),
            None => self.snapshot(&query),
        };
        Ok(self.listeners.register(query, sink, initial))
    }

    fn begin_write(&self, kind: WriteKind) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        match self.faults_guard().writes.remove(&kind) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn documents(&self) -> MutexGuard<'_, Documents> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults_guard(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingStore for MemoryStore {
    async fn get_thread(&self, id: &ThreadId) -> Result<Thread> {
        self.thread(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create_thread_if_absent(&self, thread: &Thread) -> Result<bool> {
        self.begin_write(WriteKind::CreateThread)?;

        let created = {
            let mut docs = self.documents();
            if docs.threads.contains_key(&thread.id) {
                None
            } else {
                let now = store_now();
                let mut stored = thread.clone();
                stored.created_at = now;
                stored.updated_at = now;
                stored.last_timestamp = now;
                docs.threads.insert(stored.id.clone(), stored.clone());
                Some(stored)
            }
        };

        match created {
            Some(stored) => {
                debug!(thread = %stored.id, "Thread created");
                self.listeners
                    .notify(Change::Thread(&stored), |query| self.snapshot(query));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn subscribe_thread(&self, id: &ThreadId, sink: EventSink) -> Result<SubscriptionId> {
        self.register(QueryDescriptor::Thread(id.clone()), sink)
    }

    fn subscribe_threads_by_participant(
        &self,
        user_id: &UserId,
        sink: EventSink,
    ) -> Result<SubscriptionId> {
        self.register(QueryDescriptor::ThreadsByParticipant(user_id.clone()), sink)
    }

    fn subscribe_messages(
        &self,
        thread_id: &ThreadId,
        limit: usize,
        sink: EventSink,
    ) -> Result<SubscriptionId> {
        let query = QueryDescriptor::Messages {
            thread_id: thread_id.clone(),
            limit,
        };
        self.register(query, sink)
    }

    async fn append_message(&self, thread_id: &ThreadId, message: NewMessage) -> Result<MessageId> {
        self.begin_write(WriteKind::AppendMessage)?;

        let id = Uuid::new_v4();
        {
            let mut docs = self.documents();
            let log = docs.messages.entry(thread_id.clone()).or_default();
            let now = store_now();
            let timestamp = log.last().map_or(now, |last| last.timestamp.max(now));
            log.push(Message {
                id,
                thread_id: thread_id.clone(),
                sender_id: message.sender_id,
                sender_display_name: message.sender_display_name,
                content: message.content,
                timestamp,
            });
        }

        debug!(msg_id = %id, thread = %thread_id, "Message appended");
        self.listeners
            .notify(Change::Messages(thread_id), |query| self.snapshot(query));
        Ok(id)
    }

    async fn update_thread_summary(&self, thread_id: &ThreadId, update: SummaryUpdate) -> Result<()> {
        self.begin_write(WriteKind::UpdateSummary)?;

        let updated = {
            let mut docs = self.documents();
            let thread = docs
                .threads
                .get_mut(thread_id)
                .ok_or_else(|| StoreError::NotFound(thread_id.to_string()))?;
            let now = store_now();
            thread.last_message = update.last_message;
            thread.last_timestamp = now;
            thread.updated_at = now;
            thread.clone()
        };

        self.listeners
            .notify(Change::Thread(&updated), |query| self.snapshot(query));
        Ok(())
    }

    fn cancel(&self, subscription: SubscriptionId) {
        self.listeners.cancel(subscription);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn new_message(sender: &str, content: &str) -> NewMessage {
        NewMessage {
            sender_id: uid(sender),
            sender_display_name: sender.to_uppercase(),
            content: content.to_string(),
        }
    }

    fn dm(a: &str, b: &str) -> Thread {
        Thread::new_direct((&uid(a), a), (&uid(b), b)).unwrap()
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = MemoryStore::new();
        let thread = dm("u1", "u2");

        assert!(store.create_thread_if_absent(&thread).await.unwrap());
        assert!(!store.create_thread_if_absent(&thread).await.unwrap());
        assert!(store.get_thread(&thread.id).await.is_ok());
    }

    #[tokio::test]
    async fn get_missing_thread_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_thread(&ThreadId::global()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn message_timestamps_non_decreasing() {
        let store = MemoryStore::new();
        let id = ThreadId::global();
        for i in 0..50 {
            store
                .append_message(&id, new_message("u1", &format!("m{i}")))
                .await
                .unwrap();
        }

        let log = store.messages(&id);
        assert_eq!(log.len(), 50);
        assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn message_window_keeps_newest_ascending() {
        let store = MemoryStore::new();
        let id = ThreadId::global();
        for i in 0..120 {
            store
                .append_message(&id, new_message("u1", &format!("m{i}")))
                .await
                .unwrap();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_messages(&id, 100, tx).unwrap();

        match rx.try_recv().unwrap().payload.unwrap() {
            Snapshot::Messages { messages, .. } => {
                assert_eq!(messages.len(), 100);
                assert_eq!(messages[0].content, "m20");
                assert_eq!(messages[99].content, "m119");
            }
            other => panic!("unexpected snapshot {other:?}"),
        }
    }

    #[tokio::test]
    async fn participant_query_orders_by_latest_activity() {
        let store = MemoryStore::new();
        let older = dm("u1", "u2");
        let newer = dm("u1", "u3");
        store.create_thread_if_absent(&older).await.unwrap();
        store.create_thread_if_absent(&newer).await.unwrap();
        store.create_thread_if_absent(&dm("u2", "u3")).await.unwrap();
        store.create_thread_if_absent(&Thread::new_global()).await.unwrap();

        store
            .update_thread_summary(&older.id, SummaryUpdate { last_message: "hi".into() })
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_threads_by_participant(&uid("u1"), tx).unwrap();

        match rx.try_recv().unwrap().payload.unwrap() {
            Snapshot::Threads(threads) => {
                let ids: Vec<&str> = threads.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(ids, vec!["dm_u1_u2", "dm_u1_u3"]);
            }
            other => panic!("unexpected snapshot {other:?}"),
        }
    }

    #[tokio::test]
    async fn writes_push_fresh_snapshots() {
        let store = MemoryStore::new();
        let thread = dm("u1", "u2");
        store.create_thread_if_absent(&thread).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_messages(&thread.id, 100, tx.clone()).unwrap();
        store.subscribe_thread(&thread.id, tx).unwrap();
        while rx.try_recv().is_ok() {}

        store
            .append_message(&thread.id, new_message("u1", "hello"))
            .await
            .unwrap();
        let event = rx.try_recv().unwrap();
        assert!(matches!(event.payload, Ok(Snapshot::Messages { ref messages, .. }) if messages.len() == 1));

        store
            .update_thread_summary(&thread.id, SummaryUpdate { last_message: "hello".into() })
            .await
            .unwrap();
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event.payload,
            Ok(Snapshot::Thread { thread: Some(ref t), .. }) if t.last_message == "hello"
        ));
    }

    #[tokio::test]
    async fn cancelled_subscription_goes_quiet() {
        let store = MemoryStore::new();
        let id = ThreadId::global();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = store.subscribe_messages(&id, 100, tx).unwrap();
        rx.try_recv().unwrap();

        store.cancel(sub);
        store.cancel(sub);
        store.append_message(&id, new_message("u1", "later")).await.unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn injected_query_fault_is_delivered_once() {
        let store = MemoryStore::new();
        store.fail_next_subscribe(
            QueryKind::ThreadsByParticipant,
            StoreError::FailedPrecondition("index".into()),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_threads_by_participant(&uid("u1"), tx.clone()).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap().payload,
            Err(StoreError::FailedPrecondition(_))
        ));
        assert_eq!(store.active_subscriptions(), 0);

        store.subscribe_threads_by_participant(&uid("u1"), tx).unwrap();
        assert!(rx.try_recv().unwrap().payload.is_ok());
    }

    #[test]
    fn refused_subscribe_registers_nothing() {
        let store = MemoryStore::new();
        store.refuse_next_subscribe(QueryKind::Messages, StoreError::Unavailable("offline".into()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = store
            .subscribe_messages(&ThreadId::global(), 100, tx.clone())
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(rx.try_recv().is_err());
        assert_eq!(store.active_subscriptions(), 0);

        store.subscribe_messages(&ThreadId::global(), 100, tx).unwrap();
        assert!(rx.try_recv().unwrap().payload.is_ok());
        assert_eq!(store.active_subscriptions(), 1);
    }

    #[tokio::test]
    async fn summary_update_on_missing_thread_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_thread_summary(&ThreadId::global(), SummaryUpdate { last_message: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn injected_write_fault_counts_as_write() {
        let store = MemoryStore::new();
        store.fail_next_write(
            WriteKind::AppendMessage,
            StoreError::Unavailable("offline".into()),
        );

        let id = ThreadId::global();
        assert!(store.append_message(&id, new_message("u1", "a")).await.is_err());
        assert!(store.append_message(&id, new_message("u1", "b")).await.is_ok());
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.messages(&id).len(), 1);
    }
}
