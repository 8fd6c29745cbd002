//! Sending a message: append, then refresh the thread summary.

use std::sync::Arc;

use tracing::{debug, warn};

use lockerroom_shared::text::{summarize, validate_content};
use lockerroom_shared::{MessagingError, ThreadId, UserId};
use lockerroom_store::{MessageId, MessagingStore, NewMessage, SummaryUpdate};

use crate::error::SendError;

/// A message that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: MessageId,
    /// Summary written to the thread.
    pub last_message: String,
}

pub struct MessageComposer {
    store: Arc<dyn MessagingStore>,
}

impl MessageComposer {
    pub fn new(store: Arc<dyn MessagingStore>) -> Self {
        Self { store }
    }

    /// Validate, append, then update the thread summary.
    ///
    /// The two writes are not atomic.  If the summary update fails the
    /// message stays in the log and [`SendError::SummaryStale`] is returned.
    pub async fn send(
        &self,
        thread_id: &ThreadId,
        sender_id: &UserId,
        sender_display_name: &str,
        content: &str,
    ) -> Result<SendReceipt, SendError> {
        let content = validate_content(content)?;

        let message = NewMessage {
            sender_id: sender_id.clone(),
            sender_display_name: sender_display_name.to_string(),
            content: content.to_string(),
        };

        let message_id = self
            .store
            .append_message(thread_id, message)
            .await
            .map_err(|e| {
                let err = MessagingError::from(e);
                warn!(thread = %thread_id, error = %err, "Append failed");
                SendError::Append(err)
            })?;
        debug!(thread = %thread_id, msg_id = %message_id, "Message appended");

        let last_message = summarize(content);
        if let Err(e) = self
            .store
            .update_thread_summary(
                thread_id,
                SummaryUpdate {
                    last_message: last_message.clone(),
                },
            )
            .await
        {
            let source = MessagingError::from(e);
            warn!(
                thread = %thread_id,
                msg_id = %message_id,
                error = %source,
                "Message stored but thread summary not updated"
            );
            return Err(SendError::SummaryStale { message_id, source });
        }

        Ok(SendReceipt {
            message_id,
            last_message,
        })
    }
}
