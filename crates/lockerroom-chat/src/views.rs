//! View models handed to the host UI.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lockerroom_shared::constants::EMPTY_THREAD_PREVIEW;
use lockerroom_shared::{ThreadId, UserId};
use lockerroom_store::{Message, MessageId};

/// One row of the direct-thread directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: ThreadId,
    pub other_user_id: UserId,
    pub other_name: String,
    /// Raw summary from the thread; empty before the first message.
    pub last_message: String,
    pub last_timestamp: DateTime<Utc>,
}

impl ThreadSummary {
    /// Text to show under the name.
    pub fn preview(&self) -> &str {
        if self.last_message.is_empty() {
            EMPTY_THREAD_PREVIEW
        } else {
            &self.last_message
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender_display_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Sent by the viewing user.
    pub is_own: bool,
}

impl MessageView {
    pub fn from_message(message: Message, viewer: &UserId, placeholder: &str) -> Self {
        let is_own = message.sender_id == *viewer;
        let sender_display_name = if message.sender_display_name.trim().is_empty() {
            placeholder.to_string()
        } else {
            message.sender_display_name
        };
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender_display_name,
            content: message.content,
            timestamp: message.timestamp,
            is_own,
        }
    }
}

/// Title block of the open thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHeader {
    pub thread_id: ThreadId,
    pub title: String,
    pub subtitle: String,
    pub is_direct: bool,
}
