//! # lockerroom-store
//!
//! The realtime document store behind Lockerroom chat.
//!
//! [`MessagingStore`] is the narrow contract the messaging subsystem consumes:
//! thread documents, an append-only message log per thread, and live queries
//! that push a full snapshot to their sink whenever the result may have
//! changed.  Two backends implement it:
//!
//! - [`MemoryStore`], an in-process store with fault injection, used by tests
//!   and embedders that keep everything in memory;
//! - [`SqliteStore`], a durable local store on top of `rusqlite`.

pub mod contract;
pub mod database;
pub mod listeners;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod query;
pub mod sqlite;
pub mod threads;

mod error;

pub use contract::MessagingStore;
pub use database::Database;
pub use error::{Result, StoreError};
pub use listeners::ListenerRegistry;
pub use memory::{MemoryStore, WriteKind};
pub use models::*;
pub use query::{Change, EventSink, QueryDescriptor, QueryKind, Snapshot, StoreEvent, SubscriptionId};
pub use sqlite::SqliteStore;
