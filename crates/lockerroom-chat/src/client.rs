//! The chat facade a host UI drives.
//!
//! [`ChatClient`] bundles the subscription manager, the thread directory, the
//! composer and the open session, and turns UI intents (open a thread, send a
//! message) into calls on them.  It is owned by a single task: intents and
//! event dispatch both go through `&mut self`.

use std::sync::Arc;

use tracing::{info, warn};

use lockerroom_shared::constants::SELF_PLACEHOLDER_NAME;
use lockerroom_shared::{compute_direct_id, MessagingError, Result, ThreadId, UserId};
use lockerroom_store::{MessagingStore, StoreError, Thread};

use crate::composer::{MessageComposer, SendReceipt};
use crate::config::ChatConfig;
use crate::directory::{DirectoryConsumer, ThreadDirectory};
use crate::error::SendError;
use crate::session::{ActiveChatSession, SessionConsumer};
use crate::subscriptions::{SubscriptionHandle, SubscriptionManager};
use crate::users::UserDirectory;
use crate::views::SessionHeader;

/// The signed-in user, as supplied by the host's auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub display_name: Option<String>,
}

impl CurrentUser {
    pub fn new(id: UserId, display_name: Option<String>) -> Self {
        Self { id, display_name }
    }
}

pub struct ChatClient {
    config: ChatConfig,
    store: Arc<dyn MessagingStore>,
    users: Arc<dyn UserDirectory>,
    manager: SubscriptionManager,
    directory: ThreadDirectory,
    composer: MessageComposer,
    session: ActiveChatSession,
    current_user: Option<CurrentUser>,
}

impl ChatClient {
    pub fn new(
        config: ChatConfig,
        store: Arc<dyn MessagingStore>,
        users: Arc<dyn UserDirectory>,
        session_consumer: Arc<dyn SessionConsumer>,
    ) -> Self {
        let manager = SubscriptionManager::new(Arc::clone(&store));
        let directory = ThreadDirectory::new(Arc::clone(&users), config.placeholder_name.clone());
        let composer = MessageComposer::new(Arc::clone(&store));
        let session = ActiveChatSession::new(
            session_consumer,
            config.message_window,
            config.placeholder_name.clone(),
        );
        Self {
            config,
            store,
            users,
            manager,
            directory,
            composer,
            session,
            current_user: None,
        }
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Set the signed-in user.  Switching users drops every subscription of
    /// the previous one.
    pub fn sign_in(&mut self, user: CurrentUser) {
        if self.current_user.as_ref().is_some_and(|u| u.id != user.id) {
            self.cleanup();
        }
        info!(user = %user.id, "Signed in");
        self.current_user = Some(user);
    }

    pub fn sign_out(&mut self) {
        self.cleanup();
        if let Some(user) = self.current_user.take() {
            info!(user = %user.id, "Signed out");
        }
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    fn require_user(&self) -> Result<&CurrentUser> {
        self.current_user.as_ref().ok_or(MessagingError::AuthRequired)
    }

    // ------------------------------------------------------------------
    // Directory
    // ------------------------------------------------------------------

    /// Subscribe to the signed-in user's direct threads.
    pub fn start_directory(
        &mut self,
        consumer: Arc<dyn DirectoryConsumer>,
    ) -> Result<SubscriptionHandle> {
        let Some(user) = self.current_user.as_ref() else {
            warn!("No signed-in user, directory not started");
            return Err(MessagingError::AuthRequired);
        };
        self.directory.refresh(&mut self.manager, &user.id, consumer)
    }

    pub fn stop_directory(&mut self) {
        self.directory.stop(&mut self.manager);
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    /// Create the global thread if the store does not have it yet.
    pub async fn ensure_global_thread(&self) -> Result<bool> {
        let created = self
            .store
            .create_thread_if_absent(&Thread::new_global())
            .await?;
        if created {
            info!("Global thread provisioned");
        }
        Ok(created)
    }

    pub fn open_thread(
        &mut self,
        thread_id: ThreadId,
        display_name: &str,
        is_direct: bool,
    ) -> Result<SessionHeader> {
        let viewer = self.require_user()?.id.clone();
        self.session
            .open(&mut self.manager, &viewer, thread_id, display_name, is_direct)
    }

    pub fn open_global(&mut self) -> Result<SessionHeader> {
        let title = self.config.global_title.clone();
        self.open_thread(ThreadId::global(), &title, false)
    }

    /// Open the direct thread with `target`, creating it on first contact.
    pub async fn open_direct_chat_with(&mut self, target: &UserId) -> Result<SessionHeader> {
        let me = self.require_user()?.clone();
        if me.id == *target {
            return Err(MessagingError::SelfMessage);
        }
        let thread_id = compute_direct_id(&me.id, target)?;

        let thread = match self.store.get_thread(&thread_id).await {
            Ok(thread) => thread,
            Err(StoreError::NotFound(_)) => {
                let my_name = self
                    .users
                    .cached_display_name(&me.id)
                    .or_else(|| me.display_name.clone().filter(|n| !n.trim().is_empty()))
                    .unwrap_or_else(|| SELF_PLACEHOLDER_NAME.to_string());
                let other_name = self.directory.display_name(None, target);

                let thread = Thread::new_direct(
                    (&me.id, my_name.as_str()),
                    (target, other_name.as_str()),
                )?;
                if self.store.create_thread_if_absent(&thread).await? {
                    info!(thread = %thread.id, "Direct thread created");
                }
                thread
            }
            Err(e) => return Err(e.into()),
        };

        let title = self.directory.display_name(Some(&thread), target);
        self.open_thread(thread_id, &title, true)
    }

    pub fn close_session(&mut self) {
        self.session.close(&mut self.manager);
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Send `text` to the open thread as the signed-in user.
    pub async fn send_message(&self, text: &str) -> std::result::Result<SendReceipt, SendError> {
        let me = self.require_user()?;
        let thread_id = self
            .session
            .current_thread()
            .ok_or(MessagingError::NoActiveThread)?;

        let name = me
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.users.cached_display_name(&me.id))
            .unwrap_or_else(|| self.config.placeholder_name.clone());

        self.composer.send(thread_id, &me.id, &name, text).await
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Drop every subscription and forget the open thread.
    pub fn cleanup(&mut self) {
        self.manager.detach_all();
        self.session.close(&mut self.manager);
    }

    pub fn session(&self) -> &ActiveChatSession {
        &self.session
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.manager
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn dispatch_pending(&mut self) -> usize {
        self.manager.dispatch_pending()
    }

    pub async fn next_event(&mut self) {
        self.manager.next_event().await
    }
}

#[cfg(test)]
mod tests {
    use lockerroom_store::MemoryStore;

    use super::*;
    use crate::users::CachedUserDirectory;
    use crate::views::MessageView;

    struct Quiet;

    impl SessionConsumer for Quiet {
        fn on_opened(&self, _header: &SessionHeader) {}
        fn on_messages(&self, _thread_id: &ThreadId, _messages: Vec<MessageView>) {}
        fn on_error(&self, _error: MessagingError) {}
    }

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn client(store: Arc<MemoryStore>, users: Arc<CachedUserDirectory>) -> ChatClient {
        ChatClient::new(ChatConfig::default(), store, users, Arc::new(Quiet))
    }

    #[tokio::test]
    async fn intents_require_sign_in() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(store, Arc::new(CachedUserDirectory::new()));

        assert_eq!(client.open_global(), Err(MessagingError::AuthRequired));
        assert_eq!(
            client.open_direct_chat_with(&uid("u2")).await,
            Err(MessagingError::AuthRequired)
        );
        assert_eq!(
            client.send_message("hi").await,
            Err(SendError::Blocked(MessagingError::AuthRequired))
        );
    }

    #[tokio::test]
    async fn send_without_open_thread_is_blocked() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(store.clone(), Arc::new(CachedUserDirectory::new()));
        client.sign_in(CurrentUser::new(uid("u1"), Some("Ana".into())));

        assert_eq!(
            client.send_message("hi").await,
            Err(SendError::Blocked(MessagingError::NoActiveThread))
        );
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn direct_chat_with_self_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(store.clone(), Arc::new(CachedUserDirectory::new()));
        client.sign_in(CurrentUser::new(uid("u1"), None));

        assert_eq!(
            client.open_direct_chat_with(&uid("u1")).await,
            Err(MessagingError::SelfMessage)
        );
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn direct_chat_is_created_once_with_name_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(CachedUserDirectory::new());
        users.insert(uid("u2"), "Ben");
        let mut client = client(store.clone(), users);
        client.sign_in(CurrentUser::new(uid("u1"), None));

        let header = client.open_direct_chat_with(&uid("u2")).await.unwrap();
        assert_eq!(header.title, "Ben");
        assert!(header.is_direct);
        assert_eq!(header.thread_id.as_str(), "dm_u1_u2");

        let thread = store.thread(&header.thread_id).unwrap();
        assert_eq!(thread.display_names.get(&uid("u1")).map(String::as_str), Some("You"));
        assert_eq!(thread.display_names.get(&uid("u2")).map(String::as_str), Some("Ben"));

        client.open_direct_chat_with(&uid("u2")).await.unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn sign_out_cleans_up() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(store.clone(), Arc::new(CachedUserDirectory::new()));
        client.sign_in(CurrentUser::new(uid("u1"), Some("Ana".into())));
        client.ensure_global_thread().await.unwrap();
        client.open_global().unwrap();
        assert!(client.session().current_thread().is_some());

        client.sign_out();
        assert!(client.current_user().is_none());
        assert!(client.session().current_thread().is_none());
        assert_eq!(store.active_subscriptions(), 0);
    }
}
