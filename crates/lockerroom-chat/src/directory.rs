//! The current user's list of direct threads.

use std::sync::Arc;

use tracing::{debug, warn};

use lockerroom_shared::{MessagingError, Result, UserId};
use lockerroom_store::{QueryDescriptor, Snapshot, Thread};

use crate::subscriptions::{
    SubscriptionHandle, SubscriptionKind, SubscriptionListener, SubscriptionManager,
};
use crate::users::UserDirectory;
use crate::views::ThreadSummary;

/// Receives the directory.  Every call carries the full list.
pub trait DirectoryConsumer: Send + Sync {
    fn on_threads(&self, threads: Vec<ThreadSummary>);
    fn on_error(&self, error: MessagingError);
}

pub struct ThreadDirectory {
    users: Arc<dyn UserDirectory>,
    placeholder: String,
}

impl ThreadDirectory {
    pub fn new(users: Arc<dyn UserDirectory>, placeholder: impl Into<String>) -> Self {
        Self {
            users,
            placeholder: placeholder.into(),
        }
    }

    /// (Re)subscribe to the direct threads of `current_user`.
    pub fn refresh(
        &self,
        manager: &mut SubscriptionManager,
        current_user: &UserId,
        consumer: Arc<dyn DirectoryConsumer>,
    ) -> Result<SubscriptionHandle> {
        let listener = DirectoryListener {
            me: current_user.clone(),
            resolver: NameResolver {
                users: Arc::clone(&self.users),
                placeholder: self.placeholder.clone(),
            },
            consumer,
        };
        manager.attach(
            SubscriptionKind::Directory,
            QueryDescriptor::ThreadsByParticipant(current_user.clone()),
            Box::new(listener),
        )
    }

    pub fn stop(&self, manager: &mut SubscriptionManager) {
        manager.detach(SubscriptionKind::Directory);
    }

    /// Name shown for `user` in the context of `thread`.
    pub fn display_name(&self, thread: Option<&Thread>, user: &UserId) -> String {
        NameResolver {
            users: Arc::clone(&self.users),
            placeholder: self.placeholder.clone(),
        }
        .resolve(thread, user)
    }
}

struct NameResolver {
    users: Arc<dyn UserDirectory>,
    placeholder: String,
}

impl NameResolver {
    /// Cached profile name, then the thread's creation-time snapshot, then
    /// the placeholder.
    fn resolve(&self, thread: Option<&Thread>, user: &UserId) -> String {
        if let Some(name) = self.users.cached_display_name(user) {
            return name;
        }
        let snapshot = thread
            .and_then(|t| t.display_names.get(user))
            .filter(|name| !name.trim().is_empty());
        match snapshot {
            Some(name) => name.clone(),
            None => {
                debug!(user = %user, "No display name known, using placeholder");
                self.placeholder.clone()
            }
        }
    }
}

struct DirectoryListener {
    me: UserId,
    resolver: NameResolver,
    consumer: Arc<dyn DirectoryConsumer>,
}

impl DirectoryListener {
    fn summarize(&self, threads: &[Thread]) -> Vec<ThreadSummary> {
        threads
            .iter()
            .filter_map(|thread| {
                let Some(other) = thread.other_participant(&self.me) else {
                    warn!(thread = %thread.id, "Direct thread without a second participant");
                    return None;
                };
                Some(ThreadSummary {
                    id: thread.id.clone(),
                    other_user_id: other.clone(),
                    other_name: self.resolver.resolve(Some(thread), other),
                    last_message: thread.last_message.clone(),
                    last_timestamp: thread.last_timestamp,
                })
            })
            .collect()
    }
}

impl SubscriptionListener for DirectoryListener {
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Threads(threads) => {
                let summaries = self.summarize(&threads);
                debug!(user = %self.me, threads = summaries.len(), "Directory updated");
                self.consumer.on_threads(summaries);
            }
            other => warn!(snapshot = ?other, "Unexpected snapshot on directory subscription"),
        }
    }

    fn on_error(&mut self, error: MessagingError) {
        self.consumer.on_threads(Vec::new());
        self.consumer.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use lockerroom_shared::constants::PLACEHOLDER_NAME;
    use lockerroom_store::{MemoryStore, MessagingStore, QueryKind, StoreError, SummaryUpdate};

    use super::*;
    use crate::users::CachedUserDirectory;

    #[derive(Default)]
    struct Recorder {
        lists: Mutex<Vec<Vec<ThreadSummary>>>,
        errors: Mutex<Vec<MessagingError>>,
    }

    impl DirectoryConsumer for Recorder {
        fn on_threads(&self, threads: Vec<ThreadSummary>) {
            self.lists.lock().unwrap().push(threads);
        }

        fn on_error(&self, error: MessagingError) {
            self.errors.lock().unwrap().push(error);
        }
    }

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn names_fall_back_in_order() {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(CachedUserDirectory::new());
        users.insert(uid("u2"), "Ben (profile)");

        let with_cached = Thread::new_direct((&uid("u1"), "Ana"), (&uid("u2"), "Ben")).unwrap();
        let with_snapshot = Thread::new_direct((&uid("u1"), "Ana"), (&uid("u3"), "Cleo")).unwrap();
        let with_nothing = Thread::new_direct((&uid("u1"), "Ana"), (&uid("u4"), "")).unwrap();
        for thread in [&with_cached, &with_snapshot, &with_nothing] {
            store.create_thread_if_absent(thread).await.unwrap();
        }

        let mut manager = SubscriptionManager::new(store.clone());
        let directory = ThreadDirectory::new(users, PLACEHOLDER_NAME);
        let recorder = Arc::new(Recorder::default());
        directory.refresh(&mut manager, &uid("u1"), recorder.clone()).unwrap();
        manager.dispatch_pending();

        let lists = recorder.lists.lock().unwrap();
        let names: Vec<(&str, &str)> = lists[0]
            .iter()
            .map(|s| (s.other_user_id.as_str(), s.other_name.as_str()))
            .collect();
        assert!(names.contains(&("u2", "Ben (profile)")));
        assert!(names.contains(&("u3", "Cleo")));
        assert!(names.contains(&("u4", "Player")));
    }

    #[tokio::test]
    async fn summary_update_pushes_full_list() {
        let store = Arc::new(MemoryStore::new());
        let thread = Thread::new_direct((&uid("u1"), "Ana"), (&uid("u2"), "Ben")).unwrap();
        store.create_thread_if_absent(&thread).await.unwrap();

        let mut manager = SubscriptionManager::new(store.clone());
        let directory = ThreadDirectory::new(Arc::new(CachedUserDirectory::new()), "Player");
        let recorder = Arc::new(Recorder::default());
        directory.refresh(&mut manager, &uid("u2"), recorder.clone()).unwrap();

        store
            .update_thread_summary(&thread.id, SummaryUpdate { last_message: "gg".into() })
            .await
            .unwrap();
        manager.dispatch_pending();

        let lists = recorder.lists.lock().unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0][0].preview(), "Start chatting");
        assert_eq!(lists[1][0].last_message, "gg");
        assert_eq!(lists[1][0].other_name, "Ana");
    }

    #[test]
    fn denied_directory_reports_empty_list_then_error() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_subscribe(
            QueryKind::ThreadsByParticipant,
            StoreError::PermissionDenied("rules".into()),
        );

        let mut manager = SubscriptionManager::new(store.clone());
        let directory = ThreadDirectory::new(Arc::new(CachedUserDirectory::new()), "Player");
        let recorder = Arc::new(Recorder::default());
        directory.refresh(&mut manager, &uid("u1"), recorder.clone()).unwrap();
        manager.dispatch_pending();

        assert_eq!(*recorder.lists.lock().unwrap(), vec![Vec::new()]);
        assert!(matches!(
            recorder.errors.lock().unwrap().as_slice(),
            [MessagingError::Permission(_)]
        ));
        assert!(!manager.is_active(SubscriptionKind::Directory));
    }

    #[test]
    fn stop_detaches() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = SubscriptionManager::new(store.clone());
        let directory = ThreadDirectory::new(Arc::new(CachedUserDirectory::new()), "Player");
        directory
            .refresh(&mut manager, &uid("u1"), Arc::new(Recorder::default()))
            .unwrap();

        directory.stop(&mut manager);
        directory.stop(&mut manager);
        assert_eq!(store.active_subscriptions(), 0);
    }
}
