//! C3 — Durable Store. SQLite behind a single `Mutex<Connection>`,
//! mirroring the single-connection-per-store convention of
//! `skynet-memory::manager::MemoryManager` and `skynet-sessions::manager::SessionManager`.
//!
//! One write transaction per ingest event or cache-fill batch (§4.3
//! transaction discipline); writes commit before the in-memory mutation
//! is announced as durable.

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use relay_core::types::{ChatId, MessageId, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Result, StoreError};
use crate::types::{
    Chat, ChannelCursor, ChatKind, Event, EventKind, Message, Reaction, Summary, UpdateCursor,
    User, UserStatus,
};

const SCHEMA_VERSION: i64 = 1;

pub struct DurableStore {
    conn: Mutex<Connection>,
}

impl DurableStore {
    /// Open (creating if absent) the skill's `skill.sqlite` database and
    /// run idempotent schema migration.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_db()?;
        Ok(store)
    }

    /// In-memory database, used by tests and by `relay-runner` in
    /// ephemeral/dry-run mode.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chats (
                id               TEXT PRIMARY KEY,
                kind             TEXT NOT NULL,
                title            TEXT NOT NULL,
                unread_count     INTEGER NOT NULL DEFAULT 0,
                participants_count INTEGER,
                is_pinned        INTEGER NOT NULL DEFAULT 0,
                is_muted         INTEGER NOT NULL DEFAULT 0,
                is_archived      INTEGER NOT NULL DEFAULT 0,
                draft_json       TEXT,
                last_message_id  INTEGER,
                last_message_date INTEGER,
                sort_order       INTEGER NOT NULL DEFAULT 0,
                updated_at       INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                chat_id     TEXT NOT NULL,
                id          INTEGER NOT NULL,
                from_id     TEXT,
                date        INTEGER NOT NULL,
                text        TEXT NOT NULL,
                is_outgoing INTEGER NOT NULL DEFAULT 0,
                is_edited   INTEGER NOT NULL DEFAULT 0,
                reply_to_id INTEGER,
                media_kind  TEXT,
                raw_json    TEXT,
                PRIMARY KEY (chat_id, id)
            );

            CREATE TABLE IF NOT EXISTS users (
                id         TEXT PRIMARY KEY,
                first_name TEXT,
                last_name  TEXT,
                username   TEXT,
                phone      TEXT,
                is_bot     INTEGER NOT NULL DEFAULT 0,
                is_self    INTEGER NOT NULL DEFAULT 0,
                status     TEXT NOT NULL DEFAULT 'unknown',
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type  TEXT NOT NULL,
                chat_id     TEXT,
                payload_json TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at);

            CREATE TABLE IF NOT EXISTS summaries (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                summary_type  TEXT NOT NULL,
                content_json  TEXT NOT NULL,
                period_start  INTEGER NOT NULL,
                period_end    INTEGER NOT NULL,
                created_at    INTEGER NOT NULL,
                UNIQUE(summary_type, period_start, period_end)
            );
            CREATE INDEX IF NOT EXISTS idx_summaries_created_at ON summaries(created_at);

            CREATE TABLE IF NOT EXISTS update_state (
                key  TEXT PRIMARY KEY,
                pts  INTEGER NOT NULL,
                qts  INTEGER NOT NULL,
                date INTEGER NOT NULL,
                seq  INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS channel_pts (
                channel_id INTEGER PRIMARY KEY,
                pts        INTEGER NOT NULL
            );
            ",
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    // -- chats -----------------------------------------------------------

    pub fn upsert_chats(&self, chats: &[Chat]) -> Result<()> {
        let mut conn = self.conn.lock().expect("db mutex poisoned");
        let tx = conn.transaction()?;
        for chat in chats {
            upsert_chat_tx(&tx, chat)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn upsert_chat(&self, chat: &Chat) -> Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        upsert_chat_tx(&conn, chat)
    }

    pub fn get_chat(&self, id: &ChatId) -> Result<Option<Chat>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.query_row(
            "SELECT id, kind, title, unread_count, participants_count, is_pinned, is_muted,
                    is_archived, draft_json, last_message_id, last_message_date, sort_order, updated_at
             FROM chats WHERE id = ?1",
            params![id.as_str()],
            row_to_chat,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn list_chats(&self) -> Result<Vec<Chat>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, kind, title, unread_count, participants_count, is_pinned, is_muted,
                    is_archived, draft_json, last_message_id, last_message_date, sort_order, updated_at
             FROM chats ORDER BY sort_order",
        )?;
        let rows = stmt.query_map([], row_to_chat)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // -- messages ----------------------------------------------------------

    pub fn upsert_messages(&self, messages: &[Message]) -> Result<()> {
        let mut conn = self.conn.lock().expect("db mutex poisoned");
        let tx = conn.transaction()?;
        for msg in messages {
            upsert_message_tx(&tx, msg)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn upsert_message(&self, msg: &Message) -> Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        upsert_message_tx(&conn, msg)
    }

    pub fn delete_messages(&self, chat_id: &ChatId, ids: &[MessageId]) -> Result<()> {
        let mut conn = self.conn.lock().expect("db mutex poisoned");
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute(
                "DELETE FROM messages WHERE chat_id = ?1 AND id = ?2",
                params![chat_id.as_str(), id.0 as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_messages(&self, chat_id: &ChatId, limit: u32) -> Result<Vec<Message>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT chat_id, id, from_id, date, text, is_outgoing, is_edited, reply_to_id, media_kind, raw_json
             FROM messages WHERE chat_id = ?1 ORDER BY date DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![chat_id.as_str(), limit], row_to_message)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // -- users ---------------------------------------------------------

    pub fn upsert_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute(
            "INSERT INTO users (id, first_name, last_name, username, phone, is_bot, is_self, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name  = excluded.last_name,
                username   = excluded.username,
                phone      = excluded.phone,
                is_bot     = excluded.is_bot,
                is_self    = excluded.is_self,
                status     = excluded.status,
                updated_at = excluded.updated_at",
            params![
                user.id.as_str(),
                user.first_name,
                user.last_name,
                user.username,
                user.phone,
                user.is_bot as i64,
                user.is_self as i64,
                status_to_str(user.status),
                user.updated_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.query_row(
            "SELECT id, first_name, last_name, username, phone, is_bot, is_self, status, updated_at
             FROM users WHERE id = ?1",
            params![id.as_str()],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }

    // -- events / summaries ---------------------------------------------

    /// Append an event row. Call within the same transaction as the
    /// triggering chat/message upsert where possible — exposed
    /// separately here because rusqlite transactions don't compose
    /// across these high-level methods; `relay-telegram::ingest` groups
    /// the calls itself per received event.
    pub fn insert_event(&self, event_type: EventKind, chat_id: Option<&ChatId>, payload: &serde_json::Value) -> Result<i64> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute(
            "INSERT INTO events (event_type, chat_id, payload_json, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                event_type_to_str(event_type),
                chat_id.map(|c| c.as_str()),
                serde_json::to_string(payload)?,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_summary(&self, summary: &Summary) -> Result<Option<i64>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        let changed = conn.execute(
            "INSERT OR IGNORE INTO summaries (summary_type, content_json, period_start, period_end, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                summary.summary_type,
                serde_json::to_string(&summary.content)?,
                summary.period_start.timestamp(),
                summary.period_end.timestamp(),
                summary.created_at.timestamp(),
            ],
        )?;
        Ok(if changed > 0 {
            Some(conn.last_insert_rowid())
        } else {
            None
        })
    }

    /// Events created at or after `since`, oldest first — the feed C13
    /// groups into summaries each tick (§4.13 step 1).
    pub fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<Event>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, event_type, chat_id, payload_json, created_at
             FROM events WHERE created_at >= ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![since.timestamp()], row_to_event)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn prune_events_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        Ok(conn.execute(
            "DELETE FROM events WHERE created_at < ?1",
            params![cutoff.timestamp()],
        )?)
    }

    pub fn prune_summaries_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        Ok(conn.execute(
            "DELETE FROM summaries WHERE created_at < ?1",
            params![cutoff.timestamp()],
        )?)
    }

    // -- cursors ---------------------------------------------------------

    pub fn get_update_cursor(&self) -> Result<Option<UpdateCursor>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.query_row(
            "SELECT pts, qts, date, seq FROM update_state WHERE key = 'global'",
            [],
            |row| {
                Ok(UpdateCursor {
                    pts: row.get(0)?,
                    qts: row.get(1)?,
                    date: row.get(2)?,
                    seq: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn set_update_cursor(&self, cursor: UpdateCursor) -> Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute(
            "INSERT INTO update_state (key, pts, qts, date, seq) VALUES ('global', ?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET pts = excluded.pts, qts = excluded.qts, date = excluded.date, seq = excluded.seq",
            params![cursor.pts, cursor.qts, cursor.date, cursor.seq],
        )?;
        Ok(())
    }

    pub fn set_channel_pts(&self, cursor: ChannelCursor) -> Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute(
            "INSERT INTO channel_pts (channel_id, pts) VALUES (?1, ?2)
             ON CONFLICT(channel_id) DO UPDATE SET pts = excluded.pts",
            params![cursor.channel_id, cursor.pts],
        )?;
        Ok(())
    }

    // -- meta ------------------------------------------------------------

    /// Schema versioned in `meta` (§6); also used by C13 to remember
    /// `last_summary_at` across ticks without a dedicated table.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(StoreError::from)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_channel_pts(&self, channel_id: i64) -> Result<Option<i64>> {
        let conn = self.conn.lock().expect("db mutex poisoned");
        conn.query_row(
            "SELECT pts FROM channel_pts WHERE channel_id = ?1",
            params![channel_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }
}

fn upsert_chat_tx(conn: &Connection, chat: &Chat) -> Result<()> {
    conn.execute(
        "INSERT INTO chats (id, kind, title, unread_count, participants_count, is_pinned, is_muted,
                             is_archived, draft_json, last_message_id, last_message_date, sort_order, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
            kind = excluded.kind, title = excluded.title, unread_count = excluded.unread_count,
            participants_count = excluded.participants_count, is_pinned = excluded.is_pinned,
            is_muted = excluded.is_muted, is_archived = excluded.is_archived,
            draft_json = excluded.draft_json, last_message_id = excluded.last_message_id,
            last_message_date = excluded.last_message_date, sort_order = excluded.sort_order,
            updated_at = excluded.updated_at",
        params![
            chat.id.as_str(),
            chat_kind_to_str(chat.kind),
            chat.title,
            chat.unread_count,
            chat.participants_count,
            chat.is_pinned as i64,
            chat.is_muted as i64,
            chat.is_archived as i64,
            chat.draft,
            chat.last_message_id.map(|m| m.0 as i64),
            chat.last_message_date.map(|d| d.timestamp()),
            chat.sort_order,
            chat.updated_at.timestamp(),
        ],
    )?;
    Ok(())
}

fn upsert_message_tx(conn: &Connection, msg: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (chat_id, id, from_id, date, text, is_outgoing, is_edited, reply_to_id, media_kind, raw_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(chat_id, id) DO UPDATE SET
            from_id = excluded.from_id, date = excluded.date, text = excluded.text,
            is_outgoing = excluded.is_outgoing, is_edited = excluded.is_edited,
            reply_to_id = excluded.reply_to_id, media_kind = excluded.media_kind,
            raw_json = excluded.raw_json",
        params![
            msg.chat_id.as_str(),
            msg.id.0 as i64,
            msg.from_id.as_ref().map(|u| u.as_str()),
            msg.date.timestamp(),
            msg.text,
            msg.is_outgoing as i64,
            msg.is_edited as i64,
            msg.reply_to_id.map(|m| m.0 as i64),
            msg.media_kind,
            serde_json::to_string(&msg.reactions).unwrap_or_default(),
        ],
    )?;
    Ok(())
}

fn row_to_chat(row: &Row) -> rusqlite::Result<Chat> {
    let kind: String = row.get(1)?;
    Ok(Chat {
        id: ChatId(row.get(0)?),
        kind: str_to_chat_kind(&kind),
        title: row.get(2)?,
        unread_count: row.get(3)?,
        participants_count: row.get(4)?,
        is_pinned: row.get::<_, i64>(5)? != 0,
        is_muted: row.get::<_, i64>(6)? != 0,
        is_archived: row.get::<_, i64>(7)? != 0,
        draft: row.get(8)?,
        last_message_id: row.get::<_, Option<i64>>(9)?.map(|v| MessageId(v as u64)),
        last_message_date: row
            .get::<_, Option<i64>>(10)?
            .map(|ts| Utc.timestamp_opt(ts, 0).unwrap()),
        sort_order: row.get(11)?,
        updated_at: Utc.timestamp_opt(row.get(12)?, 0).unwrap(),
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let reactions_json: Option<String> = row.get(9).ok();
    let reactions: Vec<Reaction> = reactions_json
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();
    Ok(Message {
        chat_id: ChatId(row.get(0)?),
        id: MessageId(row.get::<_, i64>(1)? as u64),
        from_id: row.get::<_, Option<String>>(2)?.map(UserId),
        date: Utc.timestamp_opt(row.get(3)?, 0).unwrap(),
        text: row.get(4)?,
        is_outgoing: row.get::<_, i64>(5)? != 0,
        is_edited: row.get::<_, i64>(6)? != 0,
        reply_to_id: row.get::<_, Option<i64>>(7)?.map(|v| MessageId(v as u64)),
        media_kind: row.get(8)?,
        reactions,
    })
}

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let event_type: String = row.get(1)?;
    let payload_json: String = row.get(3)?;
    Ok(Event {
        id: row.get(0)?,
        event_type: str_to_event_type(&event_type),
        chat_id: row.get::<_, Option<String>>(2)?.map(ChatId),
        payload: serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null),
        created_at: Utc.timestamp_opt(row.get(4)?, 0).unwrap(),
    })
}

fn str_to_event_type(s: &str) -> EventKind {
    match s {
        "message_edited" => EventKind::MessageEdited,
        "message_deleted" => EventKind::MessageDeleted,
        "chat_action" => EventKind::ChatAction,
        "messages_read" => EventKind::MessagesRead,
        "user_status" => EventKind::UserStatus,
        _ => EventKind::NewMessage,
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let status: String = row.get(7)?;
    Ok(User {
        id: UserId(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        phone: row.get(4)?,
        is_bot: row.get::<_, i64>(5)? != 0,
        is_self: row.get::<_, i64>(6)? != 0,
        status: str_to_status(&status),
        updated_at: Utc.timestamp_opt(row.get(8)?, 0).unwrap(),
    })
}

fn chat_kind_to_str(kind: ChatKind) -> &'static str {
    match kind {
        ChatKind::Dm => "dm",
        ChatKind::Group => "group",
        ChatKind::Supergroup => "supergroup",
        ChatKind::Channel => "channel",
    }
}

fn str_to_chat_kind(s: &str) -> ChatKind {
    match s {
        "group" => ChatKind::Group,
        "supergroup" => ChatKind::Supergroup,
        "channel" => ChatKind::Channel,
        _ => ChatKind::Dm,
    }
}

fn status_to_str(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Online => "online",
        UserStatus::Offline => "offline",
        UserStatus::Recently => "recently",
        UserStatus::Unknown => "unknown",
    }
}

fn str_to_status(s: &str) -> UserStatus {
    match s {
        "online" => UserStatus::Online,
        "offline" => UserStatus::Offline,
        "recently" => UserStatus::Recently,
        _ => UserStatus::Unknown,
    }
}

fn event_type_to_str(kind: EventKind) -> &'static str {
    match kind {
        EventKind::NewMessage => "new_message",
        EventKind::MessageEdited => "message_edited",
        EventKind::MessageDeleted => "message_deleted",
        EventKind::ChatAction => "chat_action",
        EventKind::MessagesRead => "messages_read",
        EventKind::UserStatus => "user_status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chat(id: &str) -> Chat {
        Chat {
            id: ChatId::from(id),
            kind: ChatKind::Dm,
            title: "Alice".to_string(),
            unread_count: 3,
            participants_count: None,
            is_pinned: false,
            is_muted: false,
            is_archived: false,
            draft: None,
            last_message_id: None,
            last_message_date: None,
            sort_order: 0,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_chat_then_get_round_trips() {
        let store = DurableStore::open_in_memory().unwrap();
        store.upsert_chat(&sample_chat("1")).unwrap();
        let fetched = store.get_chat(&ChatId::from("1")).unwrap().unwrap();
        assert_eq!(fetched.title, "Alice");
        assert_eq!(fetched.unread_count, 3);
    }

    #[test]
    fn upsert_chat_is_idempotent() {
        let store = DurableStore::open_in_memory().unwrap();
        let mut chat = sample_chat("1");
        store.upsert_chat(&chat).unwrap();
        chat.unread_count = 0;
        store.upsert_chat(&chat).unwrap();
        let fetched = store.get_chat(&ChatId::from("1")).unwrap().unwrap();
        assert_eq!(fetched.unread_count, 0);
        assert_eq!(store.list_chats().unwrap().len(), 1);
    }

    #[test]
    fn summary_insert_is_deduplicated_by_natural_key() {
        let store = DurableStore::open_in_memory().unwrap();
        let summary = Summary {
            id: 0,
            summary_type: "daily".to_string(),
            content: serde_json::json!({"n": 1}),
            period_start: Utc.timestamp_opt(1000, 0).unwrap(),
            period_end: Utc.timestamp_opt(2000, 0).unwrap(),
            created_at: Utc::now(),
        };
        let first = store.insert_summary(&summary).unwrap();
        let second = store.insert_summary(&summary).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn meta_round_trips_and_upserts() {
        let store = DurableStore::open_in_memory().unwrap();
        assert_eq!(store.get_meta("last_summary_at").unwrap(), None);
        store.set_meta("last_summary_at", "1000").unwrap();
        assert_eq!(store.get_meta("last_summary_at").unwrap(), Some("1000".to_string()));
        store.set_meta("last_summary_at", "2000").unwrap();
        assert_eq!(store.get_meta("last_summary_at").unwrap(), Some("2000".to_string()));
    }

    #[test]
    fn list_events_since_excludes_earlier_rows() {
        let store = DurableStore::open_in_memory().unwrap();
        store
            .insert_event(EventKind::NewMessage, Some(&ChatId::from("1")), &serde_json::json!({}))
            .unwrap();
        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        let events = store.list_events_since(cutoff).unwrap();
        assert!(events.is_empty());
        let events = store.list_events_since(Utc::now() - chrono::Duration::seconds(5)).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn prune_events_removes_only_stale_rows() {
        let store = DurableStore::open_in_memory().unwrap();
        store
            .insert_event(EventKind::NewMessage, Some(&ChatId::from("1")), &serde_json::json!({}))
            .unwrap();
        let removed = store
            .prune_events_older_than(Utc::now() + chrono::Duration::seconds(1))
            .unwrap();
        assert_eq!(removed, 1);
    }
}
