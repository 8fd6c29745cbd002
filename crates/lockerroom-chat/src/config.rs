//! Chat configuration loaded from environment variables.
//!
//! Every setting has a default, so a client can start with no configuration
//! at all.

use std::path::PathBuf;

use lockerroom_shared::constants::{
    GLOBAL_THREAD_TITLE, MAX_MESSAGE_WINDOW, MESSAGE_WINDOW, PLACEHOLDER_NAME,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// SQLite file for the durable store.
    /// Env: `LOCKERROOM_DB_PATH`
    /// Default: `None` (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Most recent messages kept per open thread.
    /// Env: `LOCKERROOM_MESSAGE_WINDOW`
    /// Default: `100`, clamped to `1..=500`.
    pub message_window: usize,

    /// Name shown for users without a known display name.
    /// Env: `LOCKERROOM_PLACEHOLDER_NAME`
    /// Default: `"Player"`
    pub placeholder_name: String,

    /// Header title of the global thread.
    /// Env: `LOCKERROOM_GLOBAL_TITLE`
    /// Default: `"Global Team Chat"`
    pub global_title: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            message_window: MESSAGE_WINDOW,
            placeholder_name: PLACEHOLDER_NAME.to_string(),
            global_title: GLOBAL_THREAD_TITLE.to_string(),
        }
    }
}

impl ChatConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("LOCKERROOM_DB_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("LOCKERROOM_MESSAGE_WINDOW") {
            match val.trim().parse::<usize>() {
                Ok(n) => {
                    config.message_window = n.clamp(1, MAX_MESSAGE_WINDOW);
                    if config.message_window != n {
                        tracing::warn!(
                            value = n,
                            using = config.message_window,
                            "LOCKERROOM_MESSAGE_WINDOW out of range, clamped"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        value = %val,
                        error = %e,
                        "Invalid LOCKERROOM_MESSAGE_WINDOW, using default"
                    );
                }
            }
        }

        if let Some(name) = lookup("LOCKERROOM_PLACEHOLDER_NAME") {
            if name.trim().is_empty() {
                tracing::warn!("Empty LOCKERROOM_PLACEHOLDER_NAME, using default");
            } else {
                config.placeholder_name = name;
            }
        }

        if let Some(title) = lookup("LOCKERROOM_GLOBAL_TITLE") {
            if !title.trim().is_empty() {
                config.global_title = title;
            }
        }

        // RUST_LOG is read by the host's tracing-subscriber EnvFilter.

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> ChatConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ChatConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = load(&[]);
        assert_eq!(config, ChatConfig::default());
        assert_eq!(config.message_window, 100);
        assert_eq!(config.placeholder_name, "Player");
        assert_eq!(config.global_title, "Global Team Chat");
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("LOCKERROOM_DB_PATH", "/tmp/chat.db"),
            ("LOCKERROOM_MESSAGE_WINDOW", "50"),
            ("LOCKERROOM_PLACEHOLDER_NAME", "Athlete"),
            ("LOCKERROOM_GLOBAL_TITLE", "Club Chat"),
        ]);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/chat.db")));
        assert_eq!(config.message_window, 50);
        assert_eq!(config.placeholder_name, "Athlete");
        assert_eq!(config.global_title, "Club Chat");
    }

    #[test]
    fn window_is_clamped_or_ignored() {
        assert_eq!(load(&[("LOCKERROOM_MESSAGE_WINDOW", "0")]).message_window, 1);
        assert_eq!(load(&[("LOCKERROOM_MESSAGE_WINDOW", "9000")]).message_window, 500);
        assert_eq!(load(&[("LOCKERROOM_MESSAGE_WINDOW", "lots")]).message_window, 100);
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = load(&[
            ("LOCKERROOM_DB_PATH", " "),
            ("LOCKERROOM_PLACEHOLDER_NAME", ""),
        ]);
        assert_eq!(config.database_path, None);
        assert_eq!(config.placeholder_name, "Player");
    }
}
