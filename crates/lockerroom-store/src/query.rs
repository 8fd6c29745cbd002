//! Live query descriptors and the events they produce.

use tokio::sync::mpsc;

use lockerroom_shared::{ThreadId, ThreadKind, UserId};

use crate::error::StoreError;
use crate::models::{Message, Thread};

/// What a subscription watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryDescriptor {
    /// A single thread document.
    Thread(ThreadId),
    /// Direct threads that list the user as a participant, newest activity
    /// first.
    ThreadsByParticipant(UserId),
    /// The newest `limit` messages of a thread, oldest first.
    Messages { thread_id: ThreadId, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Thread,
    ThreadsByParticipant,
    Messages,
}

/// A write that may change the result of some live queries.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    /// A thread document was created or its summary updated.
    Thread(&'a Thread),
    /// A message was appended to the thread's log.
    Messages(&'a ThreadId),
}

impl QueryDescriptor {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Thread(_) => QueryKind::Thread,
            Self::ThreadsByParticipant(_) => QueryKind::ThreadsByParticipant,
            Self::Messages { .. } => QueryKind::Messages,
        }
    }

    pub fn is_affected_by(&self, change: &Change<'_>) -> bool {
        match (self, change) {
            (Self::Thread(id), Change::Thread(thread)) => *id == thread.id,
            (Self::ThreadsByParticipant(user), Change::Thread(thread)) => {
                thread.kind == ThreadKind::Direct && thread.has_participant(user)
            }
            (Self::Messages { thread_id, .. }, Change::Messages(changed)) => thread_id == *changed,
            _ => false,
        }
    }
}

/// Full query result delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// `thread` is `None` when the watched document does not exist.
    Thread {
        id: ThreadId,
        thread: Option<Thread>,
    },
    Threads(Vec<Thread>),
    Messages {
        thread_id: ThreadId,
        messages: Vec<Message>,
    },
}

impl Snapshot {
    /// The thread this snapshot belongs to, if it is scoped to one.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        match self {
            Self::Thread { id, .. } => Some(id),
            Self::Messages { thread_id, .. } => Some(thread_id),
            Self::Threads(_) => None,
        }
    }
}

/// Store-side identity of a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One delivery from a live subscription.
#[derive(Debug)]
pub struct StoreEvent {
    pub subscription: SubscriptionId,
    pub payload: Result<Snapshot, StoreError>,
}

/// Channel half a store pushes [`StoreEvent`]s into.
pub type EventSink = mpsc::UnboundedSender<StoreEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn participant_query_only_sees_direct_threads_of_the_user() {
        let dm = Thread::new_direct((&uid("u1"), "A"), (&uid("u2"), "B")).unwrap();
        let global = Thread::new_global();

        let mine = QueryDescriptor::ThreadsByParticipant(uid("u1"));
        let theirs = QueryDescriptor::ThreadsByParticipant(uid("u3"));

        assert!(mine.is_affected_by(&Change::Thread(&dm)));
        assert!(!theirs.is_affected_by(&Change::Thread(&dm)));
        assert!(!mine.is_affected_by(&Change::Thread(&global)));
        assert!(!mine.is_affected_by(&Change::Messages(&dm.id)));
    }

    #[test]
    fn message_query_scoped_to_thread() {
        let t1 = ThreadId::new_unchecked("dm_a_b");
        let t2 = ThreadId::new_unchecked("dm_a_c");
        let query = QueryDescriptor::Messages {
            thread_id: t1.clone(),
            limit: 100,
        };
        assert!(query.is_affected_by(&Change::Messages(&t1)));
        assert!(!query.is_affected_by(&Change::Messages(&t2)));
        assert_eq!(query.kind(), QueryKind::Messages);
    }
}
