//! Core entities (§3): chats, messages, users, events, summaries, and
//! cursors. This module is the single source of truth both C2
//! (in-memory) and C3 (durable) operate on.

use relay_core::types::{ChatId, MessageId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Dm,
    Group,
    Supergroup,
    Channel,
}

/// Invariant 1: `chats_order` (held by [`crate::memory::StateStore`])
/// contains exactly the keys of `chats`, no duplicates.
///
/// Invariant 2: every `Message.chat_id` exists in `chats` when retained
/// in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: String,
    /// Invariant 3: never negative; read-receipt events reset it to the
    /// authoritative server value (`still_unread_count`), they do not
    /// decrement it.
    pub unread_count: u32,
    pub participants_count: Option<u32>,
    pub is_pinned: bool,
    pub is_muted: bool,
    pub is_archived: bool,
    pub draft: Option<String>,
    pub last_message_id: Option<MessageId>,
    pub last_message_date: Option<chrono::DateTime<chrono::Utc>>,
    pub sort_order: i64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub from_id: Option<UserId>,
    pub date: chrono::DateTime<chrono::Utc>,
    pub text: String,
    pub is_outgoing: bool,
    pub is_edited: bool,
    pub reply_to_id: Option<MessageId>,
    /// "unknown" for any media kind the builder layer (C7) does not
    /// recognize — builders are total, never panicking on unknown input.
    pub media_kind: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Online,
    Offline,
    Recently,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub is_bot: bool,
    pub is_self: bool,
    pub status: UserStatus,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Event kind taxonomy, grounded on
/// `original_source/skills/telegram/events/handlers.py`'s
/// registered handler set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewMessage,
    MessageEdited,
    MessageDeleted,
    ChatAction,
    MessagesRead,
    UserStatus,
}

/// Append-only. Never updated or deleted except by retention pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub event_type: EventKind,
    pub chat_id: Option<ChatId>,
    pub payload: Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Append-only. Pruned after the configured retention window (default 7
/// days, see `relay_core::config::DEFAULT_RETENTION_DAYS`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub summary_type: String,
    pub content: Value,
    pub period_start: chrono::DateTime<chrono::Utc>,
    pub period_end: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Invariant 4: an `UpdateCursor` row exists at all times once sync
/// completes; it advances monotonically except after server-signaled
/// gap recovery.
///
/// `qts`/`seq` are MTProto concepts with no Bot-API equivalent; the
/// reference Telegram adapter always reports them as `0` and advances
/// only `pts` (treated as the Bot API's `update_id` offset). See
/// DESIGN.md's Open Questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCursor {
    pub pts: i64,
    pub qts: i64,
    pub date: i64,
    pub seq: i64,
}

impl Default for UpdateCursor {
    fn default() -> Self {
        Self {
            pts: 0,
            qts: 0,
            date: 0,
            seq: 0,
        }
    }
}

/// Per-channel cursor — only `pts` is tracked per channel (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCursor {
    pub channel_id: i64,
    pub pts: i64,
}
