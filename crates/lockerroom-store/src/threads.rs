//! CRUD operations for [`Thread`] records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use lockerroom_shared::{ThreadId, ThreadKind, UserId};

use crate::database::{decode_ts, encode_ts, Database};
use crate::error::{Result, StoreError};
use crate::models::Thread;

const THREAD_COLUMNS: &str =
    "t.id, t.kind, t.display_names, t.last_message, t.last_timestamp, t.created_at, t.updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a thread and its participants unless the id already exists.
    /// Returns `true` if a row was inserted.
    pub fn insert_thread_if_absent(&self, thread: &Thread) -> Result<bool> {
        let names = serde_json::to_string(&thread.display_names)?;
        let tx = self.conn().unchecked_transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO threads
                 (id, kind, display_names, last_message, last_timestamp, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                thread.id.as_str(),
                thread.kind.as_str(),
                names,
                thread.last_message,
                encode_ts(&thread.last_timestamp),
                encode_ts(&thread.created_at),
                encode_ts(&thread.updated_at),
            ],
        )?;

        if inserted > 0 {
            for (position, user) in thread.participants.iter().enumerate() {
                tx.execute(
                    "INSERT INTO thread_participants (thread_id, user_id, position)
                     VALUES (?1, ?2, ?3)",
                    params![thread.id.as_str(), user.as_str(), position as i64],
                )?;
            }
        }

        tx.commit()?;
        Ok(inserted > 0)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single thread, `StoreError::NotFound` if absent.
    pub fn get_thread(&self, id: &ThreadId) -> Result<Thread> {
        self.find_thread(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn find_thread(&self, id: &ThreadId) -> Result<Option<Thread>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {THREAD_COLUMNS} FROM threads t WHERE t.id = ?1"),
                params![id.as_str()],
                row_to_thread,
            )
            .optional()?;

        match row {
            Some(mut thread) => {
                thread.participants = self.participants(&thread.id)?;
                Ok(Some(thread))
            }
            None => Ok(None),
        }
    }

    /// Direct threads listing `user`, most recent activity first.
    pub fn list_direct_threads_for(&self, user: &UserId) -> Result<Vec<Thread>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {THREAD_COLUMNS}
             FROM threads t
             JOIN thread_participants p ON p.thread_id = t.id
             WHERE t.kind = ?1 AND p.user_id = ?2
             ORDER BY t.last_timestamp DESC, t.id ASC"
        ))?;

        let rows = stmt.query_map(
            params![ThreadKind::Direct.as_str(), user.as_str()],
            row_to_thread,
        )?;

        let mut threads = Vec::new();
        for row in rows {
            let mut thread = row?;
            thread.participants = self.participants(&thread.id)?;
            threads.push(thread);
        }
        Ok(threads)
    }

    fn participants(&self, id: &ThreadId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM thread_participants
             WHERE thread_id = ?1
             ORDER BY position ASC",
        )?;

        let rows = stmt.query_map(params![id.as_str()], |row| {
            row.get::<_, String>(0).map(UserId::new_unchecked)
        })?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Write the summary fields and return the updated thread.
    pub fn update_thread_summary(
        &self,
        id: &ThreadId,
        last_message: &str,
        now: DateTime<Utc>,
    ) -> Result<Thread> {
        let stamp = encode_ts(&now);
        let affected = self.conn().execute(
            "UPDATE threads
             SET last_message = ?1, last_timestamp = ?2, updated_at = ?2
             WHERE id = ?3",
            params![last_message, stamp, id.as_str()],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.get_thread(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `threads` row to a [`Thread`] with no participants loaded.
fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thread> {
    let id: String = row.get(0)?;
    let kind_str: String = row.get(1)?;
    let names_json: String = row.get(2)?;
    let last_message: String = row.get(3)?;
    let last_ts: String = row.get(4)?;
    let created: String = row.get(5)?;
    let updated: String = row.get(6)?;

    let kind = ThreadKind::from_str_opt(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown thread kind {kind_str:?}").into(),
        )
    })?;

    let display_names: BTreeMap<UserId, String> = serde_json::from_str(&names_json)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Thread {
        id: ThreadId::new_unchecked(id),
        kind,
        participants: Vec::new(),
        display_names,
        last_message,
        last_timestamp: decode_ts(4, &last_ts)?,
        created_at: decode_ts(5, &created)?,
        updated_at: decode_ts(6, &updated)?,
    })
}
