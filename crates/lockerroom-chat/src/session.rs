//! The thread the user currently has open.
//!
//! An open session owns two subscription kinds: the thread document
//! ([`SubscriptionKind::ThreadMeta`]) and its message window
//! ([`SubscriptionKind::MessageWindow`]).  Opening always tears both down
//! before attaching the new ones, including when the same thread is opened
//! again.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use lockerroom_shared::constants::{DIRECT_SUBTITLE, GLOBAL_SUBTITLE};
use lockerroom_shared::{MessagingError, Result, ThreadId, UserId};
use lockerroom_store::{QueryDescriptor, Snapshot, Thread};

use crate::subscriptions::{SubscriptionKind, SubscriptionListener, SubscriptionManager};
use crate::views::{MessageView, SessionHeader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    /// Subscriptions for the thread are being attached.
    Opening(ThreadId),
    Live(ThreadId),
}

/// Receives everything the open thread produces.
pub trait SessionConsumer: Send + Sync {
    fn on_opened(&self, header: &SessionHeader);

    /// Full message window of `thread_id`, oldest first.
    fn on_messages(&self, thread_id: &ThreadId, messages: Vec<MessageView>);

    fn on_thread(&self, _thread: &Thread) {}

    /// The watched thread document does not exist.
    fn on_thread_missing(&self, _thread_id: &ThreadId) {}

    fn on_error(&self, error: MessagingError);
}

pub struct ActiveChatSession {
    consumer: Arc<dyn SessionConsumer>,
    message_window: usize,
    placeholder: String,
    state: SessionState,
    header: Option<SessionHeader>,
}

impl ActiveChatSession {
    pub fn new(
        consumer: Arc<dyn SessionConsumer>,
        message_window: usize,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            consumer,
            message_window,
            placeholder: placeholder.into(),
            state: SessionState::NoSession,
            header: None,
        }
    }

    /// Switch the session to `thread_id`.
    ///
    /// Any previous session is closed first.  If either subscription cannot
    /// be attached both are detached again and the session ends up closed.
    pub fn open(
        &mut self,
        manager: &mut SubscriptionManager,
        viewer: &UserId,
        thread_id: ThreadId,
        display_name: &str,
        is_direct: bool,
    ) -> Result<SessionHeader> {
        self.close(manager);
        self.state = SessionState::Opening(thread_id.clone());

        if let Err(err) = self.attach(manager, viewer, &thread_id) {
            warn!(thread = %thread_id, error = %err, "Opening thread failed");
            self.close(manager);
            return Err(err);
        }

        let subtitle = if is_direct {
            DIRECT_SUBTITLE
        } else {
            GLOBAL_SUBTITLE
        };
        let header = SessionHeader {
            thread_id: thread_id.clone(),
            title: display_name.to_string(),
            subtitle: subtitle.to_string(),
            is_direct,
        };
        self.state = SessionState::Live(thread_id.clone());
        self.header = Some(header.clone());

        info!(thread = %thread_id, direct = is_direct, "Session live");
        self.consumer.on_opened(&header);
        Ok(header)
    }

    fn attach(
        &self,
        manager: &mut SubscriptionManager,
        viewer: &UserId,
        thread_id: &ThreadId,
    ) -> Result<()> {
        manager.attach(
            SubscriptionKind::ThreadMeta,
            QueryDescriptor::Thread(thread_id.clone()),
            Box::new(MetaListener {
                thread_id: thread_id.clone(),
                consumer: Arc::clone(&self.consumer),
            }),
        )?;
        manager.attach(
            SubscriptionKind::MessageWindow,
            QueryDescriptor::Messages {
                thread_id: thread_id.clone(),
                limit: self.message_window,
            },
            Box::new(WindowListener {
                thread_id: thread_id.clone(),
                viewer: viewer.clone(),
                placeholder: self.placeholder.clone(),
                consumer: Arc::clone(&self.consumer),
            }),
        )?;
        Ok(())
    }

    /// Detach both session subscriptions.  Safe to call with no session.
    pub fn close(&mut self, manager: &mut SubscriptionManager) {
        manager.detach(SubscriptionKind::ThreadMeta);
        manager.detach(SubscriptionKind::MessageWindow);
        if let Some(thread) = self.current_thread() {
            debug!(thread = %thread, "Session closed");
        }
        self.state = SessionState::NoSession;
        self.header = None;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The thread of a live session.
    pub fn current_thread(&self) -> Option<&ThreadId> {
        match &self.state {
            SessionState::Live(id) => Some(id),
            _ => None,
        }
    }

    pub fn header(&self) -> Option<&SessionHeader> {
        self.header.as_ref()
    }
}

struct MetaListener {
    thread_id: ThreadId,
    consumer: Arc<dyn SessionConsumer>,
}

impl SubscriptionListener for MetaListener {
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Thread { id, .. } if id != self.thread_id => {
                trace!(thread = %id, "Dropping snapshot for another thread");
            }
            Snapshot::Thread {
                thread: Some(thread),
                ..
            } => self.consumer.on_thread(&thread),
            Snapshot::Thread { id, thread: None } => {
                warn!(thread = %id, "Thread document missing");
                self.consumer.on_thread_missing(&id);
            }
            other => warn!(snapshot = ?other, "Unexpected snapshot on thread subscription"),
        }
    }

    fn on_error(&mut self, error: MessagingError) {
        self.consumer.on_error(error);
    }
}

struct WindowListener {
    thread_id: ThreadId,
    viewer: UserId,
    placeholder: String,
    consumer: Arc<dyn SessionConsumer>,
}

impl SubscriptionListener for WindowListener {
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Messages { thread_id, .. } if thread_id != self.thread_id => {
                trace!(thread = %thread_id, "Dropping messages for another thread");
            }
            Snapshot::Messages {
                thread_id,
                messages,
            } => {
                let views = messages
                    .into_iter()
                    .map(|m| MessageView::from_message(m, &self.viewer, &self.placeholder))
                    .collect();
                self.consumer.on_messages(&thread_id, views);
            }
            other => warn!(snapshot = ?other, "Unexpected snapshot on message subscription"),
        }
    }

    fn on_error(&mut self, error: MessagingError) {
        self.consumer.on_error(error);
    }
}
