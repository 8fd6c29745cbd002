use serde::{Deserialize, Serialize};

use crate::constants::{DM_PREFIX, DM_SEPARATOR, GLOBAL_THREAD_ID};
use crate::error::MessagingError;

/// Identifier of a user, as issued by the auth provider.
///
/// Ids built through [`UserId::parse`] never contain whitespace or the
/// direct-thread separator, which keeps [`crate::compute_direct_id`]
/// injective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, MessagingError> {
        let id = raw.trim();
        if id.is_empty() || id.contains(DM_SEPARATOR) || id.chars().any(char::is_whitespace) {
            return Err(MessagingError::InvalidUserId(raw.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    /// Wrap an id read back from the store without re-validating it.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical identifier of a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ThreadId(pub(crate) String);

impl ThreadId {
    pub fn global() -> Self {
        Self(GLOBAL_THREAD_ID.to_string())
    }

    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the thread kind from the id prefix.
    pub fn kind(&self) -> ThreadKind {
        let mut prefix = String::with_capacity(DM_PREFIX.len() + 1);
        prefix.push_str(DM_PREFIX);
        prefix.push(DM_SEPARATOR);
        if self.0.starts_with(&prefix) {
            ThreadKind::Direct
        } else {
            ThreadKind::Global
        }
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThreadKind {
    Global,
    #[serde(rename = "dm")]
    Direct,
}

impl ThreadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Direct => "dm",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "global" => Some(Self::Global),
            "dm" => Some(Self::Direct),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_accepts_plain_ids() {
        let id = UserId::parse("  u1 ").unwrap();
        assert_eq!(id.as_str(), "u1");
    }

    #[test]
    fn parse_rejects_separator_and_whitespace() {
        assert!(matches!(
            UserId::parse("a_b"),
            Err(MessagingError::InvalidUserId(_))
        ));
        assert!(UserId::parse("a b").is_err());
        assert!(UserId::parse("   ").is_err());
    }

    #[test]
    fn thread_kind_from_prefix() {
        assert_eq!(ThreadId::global().kind(), ThreadKind::Global);
        assert_eq!(ThreadId::new_unchecked("dm_a_b").kind(), ThreadKind::Direct);
        assert_eq!(ThreadId::new_unchecked("dmx").kind(), ThreadKind::Global);
    }

    #[test]
    fn kind_wire_names() {
        assert_eq!(serde_json::to_string(&ThreadKind::Direct).unwrap(), "\"dm\"");
        assert_eq!(ThreadKind::from_str_opt("global"), Some(ThreadKind::Global));
        assert_eq!(ThreadKind::from_str_opt("group"), None);
    }
}
