use lockerroom_shared::{MessagingError, ValidationError};
use lockerroom_store::MessageId;
use thiserror::Error;

/// Outcome of a failed send.
///
/// The append and the summary update are two separate writes.  When only the
/// second one fails the message is already durable and the error is
/// [`SendError::SummaryStale`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Content rejected locally.  Nothing was written.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No signed-in user or no open thread.  Nothing was written.
    #[error("{0}")]
    Blocked(MessagingError),

    /// The message could not be appended.  Nothing was written.
    #[error("Failed to send message: {0}")]
    Append(MessagingError),

    /// The message was appended but the thread summary was not updated.
    #[error("Message {message_id} sent but thread summary is stale: {source}")]
    SummaryStale {
        message_id: MessageId,
        source: MessagingError,
    },
}

impl SendError {
    /// Whether the message reached the store despite the error.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::SummaryStale { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => MessagingError::Validation(err.clone()).user_message(),
            Self::Blocked(err) | Self::Append(err) => err.user_message(),
            Self::SummaryStale { .. } => {
                "Message sent, but the chat list may be out of date.".to_string()
            }
        }
    }
}

impl From<MessagingError> for SendError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::Validation(v) => Self::Validation(v),
            other => Self::Blocked(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stale_summary_counts_as_delivered() {
        let stale = SendError::SummaryStale {
            message_id: MessageId::nil(),
            source: MessagingError::StoreUnavailable("offline".into()),
        };
        assert!(stale.is_delivered());
        assert!(!SendError::Validation(ValidationError::Empty).is_delivered());
        assert!(!SendError::Append(MessagingError::Permission("rules".into())).is_delivered());
    }

    #[test]
    fn blocked_keeps_the_reason() {
        let err = SendError::from(MessagingError::NoActiveThread);
        assert_eq!(err, SendError::Blocked(MessagingError::NoActiveThread));
        assert_eq!(err.user_message(), MessagingError::NoActiveThread.user_message());
    }
}
