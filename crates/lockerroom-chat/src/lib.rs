//! # lockerroom-chat
//!
//! The realtime messaging subsystem of Lockerroom: global chat and per-pair
//! direct threads on top of a [`lockerroom_store::MessagingStore`].
//!
//! - [`SubscriptionManager`] owns every live store subscription, one per
//!   [`SubscriptionKind`], and routes store events to their listeners.
//! - [`ThreadDirectory`] turns the user's direct threads into
//!   [`ThreadSummary`] rows.
//! - [`MessageComposer`] validates and sends messages.
//! - [`ActiveChatSession`] tracks the open thread and its message window.
//! - [`ChatClient`] bundles the above behind the intents a UI issues.

pub mod client;
pub mod composer;
pub mod config;
pub mod directory;
pub mod error;
pub mod session;
pub mod subscriptions;
pub mod users;
pub mod views;

pub use client::{ChatClient, CurrentUser};
pub use composer::{MessageComposer, SendReceipt};
pub use config::ChatConfig;
pub use directory::{DirectoryConsumer, ThreadDirectory};
pub use error::SendError;
pub use session::{ActiveChatSession, SessionConsumer, SessionState};
pub use subscriptions::{
    CallbackListener, SubscriptionHandle, SubscriptionKind, SubscriptionListener,
    SubscriptionManager, SubscriptionState,
};
pub use users::{CachedUserDirectory, UserDirectory};
pub use views::{MessageView, SessionHeader, ThreadSummary};
