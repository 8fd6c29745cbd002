//! Parsing of the lines typed at the prompt.

use lockerroom_shared::{MessagingError, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the global thread.
    Global,
    /// Open (or start) a direct thread.
    Direct(UserId),
    /// Record a display name in the local user cache.
    Name(UserId, String),
    Close,
    Help,
    Quit,
    /// Anything that is not a command is sent to the open thread.
    Say(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, MessagingError> {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let (verb, args) = match rest.split_once(char::is_whitespace) {
            Some((verb, args)) => (verb, args.trim()),
            None => (rest, ""),
        };

        match verb {
            "global" => Ok(Self::Global),
            "dm" => Ok(Self::Direct(UserId::parse(args)?)),
            "name" => match args.split_once(char::is_whitespace) {
                Some((user, name)) => Ok(Self::Name(UserId::parse(user)?, name.trim().to_string())),
                // Missing user or name: show usage.
                None => Ok(Self::Help),
            },
            "close" => Ok(Self::Close),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Ok(Self::Help),
        }
    }
}

pub const HELP: &str = "\
commands:
  /global            open the global chat
  /dm <user>         open a direct chat with <user>
  /name <user> <n>   remember <n> as the name of <user>
  /close             close the open chat
  /quit              leave
anything else is sent to the open chat";
