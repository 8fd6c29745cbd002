//! # lockerroom-shared
//!
//! Leaf types shared by every Lockerroom crate: user and thread identifiers,
//! the canonical direct-thread identity, message content rules, and the
//! messaging error taxonomy.

pub mod constants;
pub mod error;
pub mod identity;
pub mod text;
pub mod types;

pub use error::{MessagingError, Result, ValidationError};
pub use identity::compute_direct_id;
pub use types::{ThreadId, ThreadKind, UserId};
