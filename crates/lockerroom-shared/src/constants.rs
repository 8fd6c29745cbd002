/// Prefix of every direct-message thread id.
pub const DM_PREFIX: &str = "dm";

/// Separator between the prefix and the two participant ids.
pub const DM_SEPARATOR: char = '_';

/// Id of the single pre-provisioned global thread.
pub const GLOBAL_THREAD_ID: &str = "global";

/// Maximum message length in characters, after trimming.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Number of characters kept in a thread's `last_message` preview.
pub const SUMMARY_PREVIEW_CHARS: usize = 30;

/// Marker appended to a truncated preview.
pub const ELLIPSIS: char = '…';

/// Most recent messages materialized per open thread.
pub const MESSAGE_WINDOW: usize = 100;

/// Upper bound accepted for a configured message window.
pub const MAX_MESSAGE_WINDOW: usize = 500;

/// Name shown for a user the directory cannot resolve.
pub const PLACEHOLDER_NAME: &str = "Player";

/// Name recorded for the current user when no profile name is known.
pub const SELF_PLACEHOLDER_NAME: &str = "You";

/// Preview shown for a thread that has no messages yet.
pub const EMPTY_THREAD_PREVIEW: &str = "Start chatting";

/// Default title of the global thread.
pub const GLOBAL_THREAD_TITLE: &str = "Global Team Chat";

pub const GLOBAL_SUBTITLE: &str = "Global chat with the whole network.";
pub const DIRECT_SUBTITLE: &str = "Direct message";

/// Composite index the participant directory query depends on.
pub const DIRECTORY_INDEX_HINT: &str =
    "chats: type (asc), users (array-contains), lastTimestamp (desc)";
