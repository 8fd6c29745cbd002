//! Prints chat events to the terminal.

use std::sync::Mutex;

use lockerroom_chat::{
    DirectoryConsumer, MessageView, SessionConsumer, SessionHeader, ThreadSummary,
};
use lockerroom_shared::{MessagingError, ThreadId};
use lockerroom_store::MessageId;

/// Remembers the last message printed for the open thread, so each window
/// snapshot only prints what is new.
#[derive(Default)]
pub struct TerminalView {
    printed: Mutex<Printed>,
}

#[derive(Default)]
struct Printed {
    thread: Option<ThreadId>,
    last: Option<MessageId>,
}

impl SessionConsumer for TerminalView {
    fn on_opened(&self, header: &SessionHeader) {
        let mut printed = self.printed.lock().unwrap_or_else(|e| e.into_inner());
        printed.thread = Some(header.thread_id.clone());
        printed.last = None;
        println!("== {} ({}) ==", header.title, header.subtitle);
    }

    fn on_messages(&self, thread_id: &ThreadId, messages: Vec<MessageView>) {
        let mut printed = self.printed.lock().unwrap_or_else(|e| e.into_inner());
        if printed.thread.as_ref() != Some(thread_id) {
            return;
        }
        let skip = printed
            .last
            .and_then(|last| messages.iter().position(|m| m.id == last))
            .map_or(0, |pos| pos + 1);
        for message in messages.iter().skip(skip) {
            let who = if message.is_own {
                "you"
            } else {
                message.sender_display_name.as_str()
            };
            println!(
                "[{}] {}: {}",
                message.timestamp.format("%H:%M"),
                who,
                message.content
            );
        }
        if let Some(newest) = messages.last() {
            printed.last = Some(newest.id);
        }
    }

    fn on_thread_missing(&self, thread_id: &ThreadId) {
        println!("! chat {thread_id} does not exist yet");
    }

    fn on_error(&self, error: MessagingError) {
        println!("! {}", error.user_message());
    }
}

impl DirectoryConsumer for TerminalView {
    fn on_threads(&self, threads: Vec<ThreadSummary>) {
        if threads.is_empty() {
            return;
        }
        println!("-- direct chats --");
        for summary in &threads {
            println!(
                "  {:<16} {:<20} {}",
                summary.other_user_id.as_str(),
                summary.other_name,
                summary.preview()
            );
        }
    }

    fn on_error(&self, error: MessagingError) {
        println!("! {}", error.user_message());
    }
}
