//! # lockerroom
//!
//! Terminal front end for Lockerroom chat.
//!
//! Opens the local SQLite store, signs in the user given by `--user` /
//! `--name` (or `LOCKERROOM_USER` / `LOCKERROOM_USER_NAME`), opens the global
//! thread and then reads commands from stdin while store events are printed
//! as they arrive.

mod commands;
mod view;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lockerroom_chat::{CachedUserDirectory, ChatClient, ChatConfig, CurrentUser};
use lockerroom_shared::UserId;
use lockerroom_store::{MessagingStore, SqliteStore};

use crate::commands::{Command, HELP};
use crate::view::TerminalView;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing to stderr, so it does not interleave with the chat on stdout
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("lockerroom_chat=debug,lockerroom_store=info,warn")
        }))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Lockerroom chat v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Configuration and identity
    // -----------------------------------------------------------------------
    let config = ChatConfig::from_env();
    info!(?config, "Loaded configuration");
    let user = current_user_from(std::env::args().skip(1))?;

    // -----------------------------------------------------------------------
    // 3. Store and client
    // -----------------------------------------------------------------------
    let store = match &config.database_path {
        Some(path) => SqliteStore::open_at(path),
        None => SqliteStore::open_default(),
    }
    .context("failed to open the chat database")?;
    let store: Arc<dyn MessagingStore> = Arc::new(store);

    let users = Arc::new(CachedUserDirectory::new());
    if let Some(name) = &user.display_name {
        users.insert(user.id.clone(), name.clone());
    }
    let view = Arc::new(TerminalView::default());
    let mut client = ChatClient::new(config, store, users.clone(), view.clone());
    client.sign_in(user);

    client.ensure_global_thread().await?;
    if let Err(e) = client.start_directory(view.clone()) {
        warn!(error = %e, "Directory unavailable");
    }
    client.open_global()?;
    println!("{HELP}");

    // -----------------------------------------------------------------------
    // 4. Event loop: typed commands and store events on one task
    // -----------------------------------------------------------------------
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&mut client, &users, &line).await {
                    break;
                }
            }
            () = client.next_event() => {}
        }
    }

    client.cleanup();
    info!("Bye");
    Ok(())
}

/// Run one typed line.  Returns `false` when the user asked to quit.
async fn handle_line(client: &mut ChatClient, users: &CachedUserDirectory, line: &str) -> bool {
    if line.trim().is_empty() {
        return true;
    }

    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(e) => {
            println!("! {}", e.user_message());
            return true;
        }
    };

    match command {
        Command::Global => {
            if let Err(e) = client.open_global() {
                println!("! {}", e.user_message());
            }
        }
        Command::Direct(target) => {
            if let Err(e) = client.open_direct_chat_with(&target).await {
                println!("! {}", e.user_message());
            }
        }
        Command::Name(user, name) => {
            println!("{user} is now known as {name}");
            users.insert(user, name);
        }
        Command::Close => client.close_session(),
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Say(text) => match client.send_message(&text).await {
            Ok(_) => {}
            Err(e) if e.is_delivered() => {
                warn!(error = %e, "Thread summary stale");
                println!("! {}", e.user_message());
            }
            Err(e) => println!("! {}", e.user_message()),
        },
    }
    true
}

/// Current user from `--user <id> [--name <name>]`, falling back to the
/// `LOCKERROOM_USER` and `LOCKERROOM_USER_NAME` environment variables.
fn current_user_from(args: impl Iterator<Item = String>) -> anyhow::Result<CurrentUser> {
    let mut user = std::env::var("LOCKERROOM_USER").ok();
    let mut name = std::env::var("LOCKERROOM_USER_NAME").ok();

    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--user" => user = args.next(),
            "--name" => name = args.next(),
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
    }

    let raw = user.context("no user given, pass --user <id> or set LOCKERROOM_USER")?;
    let id = UserId::parse(&raw)?;
    let name = name.filter(|n| !n.trim().is_empty());
    Ok(CurrentUser::new(id, name))
}
