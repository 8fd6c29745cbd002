//! Display-name lookup for other users.
//!
//! Profiles live outside the messaging subsystem.  The host keeps a
//! [`CachedUserDirectory`] filled from whatever profile source it has, and the
//! chat components only ever read from the cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use lockerroom_shared::UserId;

pub trait UserDirectory: Send + Sync {
    /// The user's display name, if the cache knows a non-empty one.
    fn cached_display_name(&self, user: &UserId) -> Option<String>;
}

#[derive(Default)]
pub struct CachedUserDirectory {
    names: RwLock<HashMap<UserId, String>>,
}

impl CachedUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserId, name: impl Into<String>) {
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user, name.into());
    }

    /// Swap the whole cache for a fresh listing.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (UserId, String)>) {
        let fresh: HashMap<UserId, String> = entries.into_iter().collect();
        *self.names.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    pub fn remove(&self, user: &UserId) -> Option<String> {
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user)
    }

    pub fn len(&self) -> usize {
        self.names.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserDirectory for CachedUserDirectory {
    fn cached_display_name(&self, user: &UserId) -> Option<String> {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .filter(|name| !name.trim().is_empty())
            .cloned()
    }
}
