//! The contract between the messaging subsystem and its document store.

use async_trait::async_trait;

use lockerroom_shared::{ThreadId, UserId};

use crate::error::Result;
use crate::models::{MessageId, NewMessage, SummaryUpdate, Thread};
use crate::query::{EventSink, QueryDescriptor, SubscriptionId};

/// A realtime document store holding threads and their message logs.
///
/// Subscriptions return as soon as they are registered.  The store then
/// pushes a first snapshot into the sink, followed by a full snapshot after
/// every write that may change the result, until [`MessagingStore::cancel`]
/// is called.  A subscription that fails delivers a single error event and
/// stops.
#[async_trait]
pub trait MessagingStore: Send + Sync {
    /// Fetch a thread document, `StoreError::NotFound` if absent.
    async fn get_thread(&self, id: &ThreadId) -> Result<Thread>;

    /// Create `thread` unless a document with its id exists.  Returns `true`
    /// when this call created it.  The store stamps `created_at`,
    /// `updated_at` and `last_timestamp` itself.
    async fn create_thread_if_absent(&self, thread: &Thread) -> Result<bool>;

    fn subscribe_thread(&self, id: &ThreadId, sink: EventSink) -> Result<SubscriptionId>;

    /// Direct threads listing `user_id`, ordered by `last_timestamp`
    /// descending.  Backends with explicit index provisioning report a
    /// missing composite index here as `StoreError::FailedPrecondition`.
    fn subscribe_threads_by_participant(
        &self,
        user_id: &UserId,
        sink: EventSink,
    ) -> Result<SubscriptionId>;

    /// The newest `limit` messages of a thread in ascending timestamp order.
    fn subscribe_messages(
        &self,
        thread_id: &ThreadId,
        limit: usize,
        sink: EventSink,
    ) -> Result<SubscriptionId>;

    /// Append to the thread's log.  The store assigns the id and timestamp.
    async fn append_message(&self, thread_id: &ThreadId, message: NewMessage) -> Result<MessageId>;

    /// Write the summary fields of an existing thread.
    async fn update_thread_summary(&self, thread_id: &ThreadId, update: SummaryUpdate) -> Result<()>;

    /// Stop a subscription.  Unknown or already cancelled ids are ignored.
    fn cancel(&self, subscription: SubscriptionId);

    fn subscribe(&self, query: &QueryDescriptor, sink: EventSink) -> Result<SubscriptionId> {
        match query {
            QueryDescriptor::Thread(id) => self.subscribe_thread(id, sink),
            QueryDescriptor::ThreadsByParticipant(user_id) => {
                self.subscribe_threads_by_participant(user_id, sink)
            }
            QueryDescriptor::Messages { thread_id, limit } => {
                self.subscribe_messages(thread_id, *limit, sink)
            }
        }
    }
}
