//! Documents held by the messaging store.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a UI layer or written to a document column.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lockerroom_shared::identity::direct_participants;
use lockerroom_shared::{ThreadId, ThreadKind, UserId};

use crate::database::store_now;

/// Store-assigned message identifier.
pub type MessageId = Uuid;

// ---------------------------------------------------------------------------
// Thread
// ---------------------------------------------------------------------------

/// A conversation container: the global chat or a direct thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Canonical identifier.
    pub id: ThreadId,
    pub kind: ThreadKind,
    /// Empty for the global thread (everyone); two sorted ids for a DM.
    pub participants: Vec<UserId>,
    /// Participant names as they were when the thread was created.
    pub display_names: BTreeMap<UserId, String>,
    /// Preview of the latest message, empty until the first send.
    pub last_message: String,
    pub last_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// A direct thread between two users, keyed by their canonical id.
    pub fn new_direct(
        (me, my_name): (&UserId, &str),
        (other, other_name): (&UserId, &str),
    ) -> lockerroom_shared::Result<Self> {
        let id = lockerroom_shared::compute_direct_id(me, other)?;
        let participants = direct_participants(me, other)?.to_vec();

        let mut display_names = BTreeMap::new();
        display_names.insert(me.clone(), my_name.to_string());
        display_names.insert(other.clone(), other_name.to_string());

        let now = store_now();
        Ok(Self {
            id,
            kind: ThreadKind::Direct,
            participants,
            display_names,
            last_message: String::new(),
            last_timestamp: now,
            created_at: now,
            updated_at: now,
        })
    }

    /// The pre-provisioned thread every user can read.
    pub fn new_global() -> Self {
        let now = store_now();
        Self {
            id: ThreadId::global(),
            kind: ThreadKind::Global,
            participants: Vec::new(),
            display_names: BTreeMap::new(),
            last_message: String::new(),
            last_timestamp: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.iter().any(|p| p == user)
    }

    /// The participant of a direct thread that is not `me`.
    pub fn other_participant(&self, me: &UserId) -> Option<&UserId> {
        if self.kind != ThreadKind::Direct {
            return None;
        }
        self.participants.iter().find(|p| *p != me)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.  Never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    /// The thread whose log holds this message.
    pub thread_id: ThreadId,
    pub sender_id: UserId,
    /// Sender name at send time; not updated when the profile changes.
    pub sender_display_name: String,
    pub content: String,
    /// Assigned by the store when the message is appended.
    pub timestamp: DateTime<Utc>,
}

/// The client-supplied part of a message.  The store fills in the id and the
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub sender_display_name: String,
    pub content: String,
}

/// Fields written to a thread after a successful append.
///
/// The store stamps `last_timestamp` and `updated_at` with its own clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryUpdate {
    pub last_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_thread_is_canonical() {
        let a = UserId::parse("u2").unwrap();
        let b = UserId::parse("u1").unwrap();
        let thread = Thread::new_direct((&a, "Ana"), (&b, "Ben")).unwrap();

        assert_eq!(thread.id.as_str(), "dm_u1_u2");
        assert_eq!(thread.kind, ThreadKind::Direct);
        assert_eq!(thread.participants, vec![b.clone(), a.clone()]);
        assert_eq!(thread.display_names.get(&a).map(String::as_str), Some("Ana"));
        assert!(thread.last_message.is_empty());
        assert_eq!(thread.other_participant(&a), Some(&b));
    }

    #[test]
    fn direct_thread_with_self_rejected() {
        let a = UserId::parse("u1").unwrap();
        assert!(Thread::new_direct((&a, "Ana"), (&a, "Ana")).is_err());
    }

    #[test]
    fn global_thread_has_no_other_participant() {
        let thread = Thread::new_global();
        let me = UserId::parse("u1").unwrap();
        assert_eq!(thread.other_participant(&me), None);
        assert!(!thread.has_participant(&me));
    }
}
