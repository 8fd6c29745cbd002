//! Durable realtime store on top of SQLite.
//!
//! Every write goes through the [`Database`] and is followed by a
//! [`ListenerRegistry::notify`] pass once the connection lock is released.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use lockerroom_shared::{ThreadId, UserId};

use crate::contract::MessagingStore;
use crate::database::{store_now, Database};
use crate::error::Result;
use crate::listeners::ListenerRegistry;
use crate::models::{MessageId, NewMessage, SummaryUpdate, Thread};
use crate::query::{Change, EventSink, QueryDescriptor, Snapshot, SubscriptionId};

pub struct SqliteStore {
    db: Mutex<Database>,
    listeners: ListenerRegistry,
}

impl SqliteStore {
    /// Open the store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::from_database(Database::new()?))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open_at(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        if let Some(path) = db.path() {
            info!(path = %path.display(), "SQLite store ready");
        }
        Self {
            db: Mutex::new(db),
            listeners: ListenerRegistry::new(),
        }
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, query: &QueryDescriptor) -> Result<Snapshot> {
        let db = self.db();
        let snapshot = match query {
            QueryDescriptor::Thread(id) => Snapshot::Thread {
                id: id.clone(),
                thread: db.find_thread(id)?,
            },
            QueryDescriptor::ThreadsByParticipant(user) => {
                Snapshot::Threads(db.list_direct_threads_for(user)?)
            }
            QueryDescriptor::Messages { thread_id, limit } => Snapshot::Messages {
                thread_id: thread_id.clone(),
                messages: db.latest_messages(thread_id, *limit)?,
            },
        };
        Ok(snapshot)
    }

    fn register(&self, query: QueryDescriptor, sink: EventSink) -> SubscriptionId {
        let initial = self.snapshot(&query);
        self.listeners.register(query, sink, initial)
    }
}

#[async_trait]
impl MessagingStore for SqliteStore {
    async fn get_thread(&self, id: &ThreadId) -> Result<Thread> {
        self.db().get_thread(id)
    }

    async fn create_thread_if_absent(&self, thread: &Thread) -> Result<bool> {
        let now = store_now();
        let mut stored = thread.clone();
        stored.created_at = now;
        stored.updated_at = now;
        stored.last_timestamp = now;

        let created = self.db().insert_thread_if_absent(&stored)?;
        if created {
            debug!(thread = %stored.id, "Thread created");
            self.listeners
                .notify(Change::Thread(&stored), |query| self.snapshot(query));
        }
        Ok(created)
    }

    fn subscribe_thread(&self, id: &ThreadId, sink: EventSink) -> Result<SubscriptionId> {
        Ok(self.register(QueryDescriptor::Thread(id.clone()), sink))
    }

    fn subscribe_threads_by_participant(
        &self,
        user_id: &UserId,
        sink: EventSink,
    ) -> Result<SubscriptionId> {
        Ok(self.register(QueryDescriptor::ThreadsByParticipant(user_id.clone()), sink))
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
        Ok(self.register(query, sink))
    }

    async fn append_message(&self, thread_id: &ThreadId, message: NewMessage) -> Result<MessageId> {
        let stored = self.db().insert_message(thread_id, message)?;

        debug!(msg_id = %stored.id, thread = %thread_id, "Message appended");
        self.listeners
            .notify(Change::Messages(thread_id), |query| self.snapshot(query));
        Ok(stored.id)
    }

    async fn update_thread_summary(&self, thread_id: &ThreadId, update: SummaryUpdate) -> Result<()> {
        let updated = self
            .db()
            .update_thread_summary(thread_id, &update.last_message, store_now())?;

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
    use crate::error::StoreError;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn new_message(content: &str) -> NewMessage {
        NewMessage {
            sender_id: uid("u1"),
            sender_display_name: "Ana".into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn threads_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let thread = Thread::new_direct((&uid("u1"), "Ana"), (&uid("u2"), "Ben")).unwrap();

        {
            let store = SqliteStore::open_at(&path).unwrap();
            assert!(store.create_thread_if_absent(&thread).await.unwrap());
            store.append_message(&thread.id, new_message("hi")).await.unwrap();
            store
                .update_thread_summary(&thread.id, SummaryUpdate { last_message: "hi".into() })
                .await
                .unwrap();
        }

        let store = SqliteStore::open_at(&path).unwrap();
        assert!(!store.create_thread_if_absent(&thread).await.unwrap());
        let reloaded = store.get_thread(&thread.id).await.unwrap();
        assert_eq!(reloaded.last_message, "hi");
        assert_eq!(reloaded.participants, vec![uid("u1"), uid("u2")]);
    }

    #[tokio::test]
    async fn subscribers_see_writes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let thread = Thread::new_direct((&uid("u1"), "Ana"), (&uid("u2"), "Ben")).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let dir_sub = store.subscribe_threads_by_participant(&uid("u2"), tx.clone()).unwrap();
        let msg_sub = store.subscribe_messages(&thread.id, 100, tx).unwrap();
        while rx.try_recv().is_ok() {}

        store.create_thread_if_absent(&thread).await.unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.subscription, dir_sub);
        assert!(matches!(event.payload, Ok(Snapshot::Threads(ref t)) if t.len() == 1));

        store.append_message(&thread.id, new_message("hello")).await.unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.subscription, msg_sub);
        assert!(matches!(
            event.payload,
            Ok(Snapshot::Messages { ref messages, .. }) if messages[0].content == "hello"
        ));
    }

    #[tokio::test]
    async fn summary_update_requires_thread() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .update_thread_summary(&ThreadId::global(), SummaryUpdate { last_message: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
