use thiserror::Error;

use crate::constants::MAX_MESSAGE_CHARS;

/// Local content checks. These never reach the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message is empty")]
    Empty,

    #[error("Message is too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },
}

/// Every failure the messaging subsystem reports to its callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No signed-in user.
    #[error("Authentication required")]
    AuthRequired,

    /// A direct thread was requested between a user and themself.
    #[error("Cannot open a direct thread with yourself")]
    SelfMessage,

    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    /// A send was attempted with no open thread.
    #[error("No thread is open")]
    NoActiveThread,

    /// Transport or backend failure.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A composite query is missing the index it needs.
    #[error("Missing composite index: {diagnostic}")]
    IndexMissing { diagnostic: String },

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl MessagingError {
    /// Text suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::Empty) => "Please enter a message.".to_string(),
            Self::Validation(ValidationError::TooLong { max, .. }) => {
                format!("Message is too long (max {max} characters).")
            }
            Self::AuthRequired => "Please log in first.".to_string(),
            Self::SelfMessage => "You cannot message yourself.".to_string(),
            Self::InvalidUserId(id) => format!("\"{id}\" is not a valid user."),
            Self::NoActiveThread => "Please select a chat first.".to_string(),
            Self::StoreUnavailable(_) => {
                "Chat is unavailable right now. Check your connection and try again.".to_string()
            }
            Self::IndexMissing { diagnostic } => {
                format!("Chat list needs a database index that is not set up yet ({diagnostic}).")
            }
            Self::Permission(_) => "Permission denied. Check the chat access rules.".to_string(),
            Self::NotFound(_) => "Chat not found. Please reopen the chat.".to_string(),
        }
    }
}

impl ValidationError {
    pub fn too_long(len: usize) -> Self {
        Self::TooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        }
    }
}

pub type Result<T> = std::result::Result<T, MessagingError>;
