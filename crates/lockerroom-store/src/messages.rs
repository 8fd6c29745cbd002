use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use lockerroom_shared::{ThreadId, UserId};

use crate::database::{decode_ts, encode_ts, store_now, Database};
use crate::error::Result;
use crate::models::{Message, NewMessage};

impl Database {
    /// Append a message, stamping it with the current time.  The stamp never
    /// goes below the thread's previous message.
    pub fn insert_message(&self, thread_id: &ThreadId, message: NewMessage) -> Result<Message> {
        let previous: Option<String> = self
            .conn()
            .query_row(
                "SELECT timestamp FROM messages
                 WHERE thread_id = ?1
                 ORDER BY timestamp DESC, seq DESC
                 LIMIT 1",
                params![thread_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let now = store_now();
        let timestamp = match previous {
            Some(raw) => decode_ts(0, &raw)?.max(now),
            None => now,
        };

        let stored = Message {
            id: Uuid::new_v4(),
            thread_id: thread_id.clone(),
            sender_id: message.sender_id,
            sender_display_name: message.sender_display_name,
            content: message.content,
            timestamp,
        };

        self.conn().execute(
            "INSERT INTO messages (id, thread_id, sender_id, sender_display_name, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                stored.id.to_string(),
                stored.thread_id.as_str(),
                stored.sender_id.as_str(),
                stored.sender_display_name,
                stored.content,
                encode_ts(&stored.timestamp),
            ],
        )?;
        Ok(stored)
    }

    /// The newest `limit` messages of a thread, oldest first.
    pub fn latest_messages(&self, thread_id: &ThreadId, limit: usize) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, thread_id, sender_id, sender_display_name, content, timestamp
             FROM (
                 SELECT seq, id, thread_id, sender_id, sender_display_name, content, timestamp
                 FROM messages
                 WHERE thread_id = ?1
                 ORDER BY timestamp DESC, seq DESC
                 LIMIT ?2
             )
             ORDER BY timestamp ASC, seq ASC",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![thread_id.as_str(), limit], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let thread_id: String = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let sender_display_name: String = row.get(3)?;
    let content: String = row.get(4)?;
    let ts_str: String = row.get(5)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id,
        thread_id: ThreadId::new_unchecked(thread_id),
        sender_id: UserId::new_unchecked(sender_id),
        sender_display_name,
        content,
        timestamp: decode_ts(5, &ts_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(content: &str) -> NewMessage {
        NewMessage {
            sender_id: UserId::parse("u1").unwrap(),
            sender_display_name: "Ana".into(),
            content: content.into(),
        }
    }

    #[test]
    fn latest_messages_window() {
        let db = Database::open_in_memory().unwrap();
        let thread = ThreadId::global();
        for i in 0..15 {
            db.insert_message(&thread, new_message(&format!("m{i}"))).unwrap();
        }
        db.insert_message(&ThreadId::new_unchecked("dm_a_b"), new_message("elsewhere"))
            .unwrap();

        let window = db.latest_messages(&thread, 10).unwrap();
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.first(), Some(&"m5"));
        assert_eq!(contents.last(), Some(&"m14"));
        assert_eq!(contents.len(), 10);
        assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn inserted_message_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let thread = ThreadId::global();
        let stored = db.insert_message(&thread, new_message("hello")).unwrap();

        let window = db.latest_messages(&thread, 100).unwrap();
        assert_eq!(window, vec![stored]);
    }
}
