//! C6 — API Client Adapter, Telegram Bot API instance (§4.6).
//!
//! The reference adapter talks to the Bot API (via `teloxide`) rather
//! than MTProto. Two capabilities MTProto-backed skills would have are
//! therefore structurally absent here, not merely unimplemented:
//!
//! - No dialog-list endpoint: [`fetch_chats`](ApiClient::fetch_chats)
//!   returns an empty list. Chats are discovered only as updates arrive
//!   through [`spawn_ingest`](ApiClient::spawn_ingest) — C9's cache-first
//!   `get_chats` degrades to "whatever has been seen so far" rather than
//!   a true remote listing.
//! - No message-history endpoint:
//!   [`fetch_messages`](ApiClient::fetch_messages) returns an empty list
//!   for the same reason.
//! - No explicit "mark read" RPC: [`mark_read`](ApiClient::mark_read) is
//!   a no-op; C9 still resets the cached `unread_count` to zero
//!   optimistically, same as a real directive would.
//!
//! These are recorded as deliberate deviations rather than bugs — see
//! DESIGN.md.
//!
//! Grounded on `adapter.rs`'s `Bot::new`/dispatcher-owns-the-bot shape,
//! generalized from "drive a teloxide `Dispatcher`" to "implement
//! `relay_runtime::ApiClient`" since this skill polls for updates itself
//! (`ingest.rs`) rather than handing control to
//! `teloxide::dispatching::Dispatcher`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::error::{Result, SkillError};
use relay_core::types::ChatId;
use relay_runtime::{ApiClient, IngestDeps};
use relay_store::types::{Chat, Message, User};
use teloxide::requests::Requester;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;

use crate::builders;
use crate::ingest;

pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Self {
        Self { bot: Bot::new(bot_token) }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Maps teloxide's error taxonomy onto ours. `RetryAfter` is the one
/// case the cache-first API's retry loop (C9) actually keys off;
/// everything else is either `Auth` (route to setup wizard) or
/// `Transient` (route to backoff-reconnect).
fn map_request_error(err: teloxide::RequestError) -> SkillError {
    match err {
        teloxide::RequestError::RetryAfter(duration) => SkillError::RateLimited {
            retry_after: Some(duration),
        },
        teloxide::RequestError::Api(api_err) => match api_err {
            teloxide::ApiError::Unauthorized => SkillError::Auth(api_err.to_string()),
            other => SkillError::Transient(other.to_string()),
        },
        teloxide::RequestError::MigrateToChatId(_) => SkillError::Transient(err.to_string()),
        teloxide::RequestError::Network(e) => SkillError::Transient(e.to_string()),
        teloxide::RequestError::Io(e) => SkillError::Transient(e.to_string()),
        teloxide::RequestError::InvalidJson { .. } => SkillError::Transient(err.to_string()),
    }
}

fn parse_chat_id(id: &ChatId) -> Result<teloxide::types::ChatId> {
    id.as_str()
        .parse::<i64>()
        .map(teloxide::types::ChatId)
        .map_err(|_| SkillError::Validation(format!("not a valid telegram chat id: {}", id.as_str())))
}

#[async_trait]
impl ApiClient for TelegramClient {
    async fn connect(&self) -> Result<User> {
        let me = self.bot.get_me().send().await.map_err(map_request_error)?;
        Ok(builders::build_user(&me.user))
    }

    async fn disconnect(&self) {}

    /// See the module note: the Bot API has no dialog-list RPC.
    async fn fetch_chats(&self, _limit: u32) -> Result<Vec<Chat>> {
        Ok(Vec::new())
    }

    async fn fetch_chat(&self, id: &ChatId) -> Result<Chat> {
        let tg_id = parse_chat_id(id)?;
        let chat = self
            .bot
            .get_chat(tg_id)
            .send()
            .await
            .map_err(map_request_error)?;
        Ok(builders::build_chat(&chat))
    }

    /// See the module note: the Bot API has no message-history RPC.
    async fn fetch_messages(&self, _chat_id: &ChatId, _limit: u32) -> Result<Vec<Message>> {
        Ok(Vec::new())
    }

    /// Splits `text` into Telegram-sized chunks (`send::split_chunks_smart`)
    /// and sends each in turn, trying MarkdownV2 first and falling back to
    /// plain text per chunk if the escaped form is still rejected. Returns
    /// the built [`Message`] for the last chunk sent — that is also what
    /// ends up as the chat's `last_message` once C9 applies the echo.
    async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<Message> {
        let tg_id = parse_chat_id(chat_id)?;
        let chunks = crate::send::split_chunks_smart(text);
        let mut last = None;
        for (i, chunk) in chunks.iter().enumerate() {
            let escaped = crate::send::escape_markdown_v2(chunk);
            let sent = self
                .bot
                .send_message(tg_id, &escaped)
                .parse_mode(teloxide::types::ParseMode::MarkdownV2)
                .send()
                .await;
            let msg = match sent {
                Ok(msg) => msg,
                Err(_) => self
                    .bot
                    .send_message(tg_id, chunk)
                    .send()
                    .await
                    .map_err(map_request_error)?,
            };
            last = Some(builders::build_message(&msg));
            if i + 1 < chunks.len() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        last.ok_or_else(|| SkillError::Validation("empty message text".to_string()))
    }

    /// No-op: see the module note.
    async fn mark_read(&self, _chat_id: &ChatId) -> Result<()> {
        Ok(())
    }

    fn spawn_ingest(
        self: Arc<Self>,
        deps: IngestDeps,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        ingest::spawn(self.bot.clone(), deps, cancel)
    }
}

/// Timeout passed to Telegram's long-poll `getUpdates`, in seconds.
pub const LONG_POLL_TIMEOUT_SECS: u64 = 25;
/// How long to wait before retrying `getUpdates` after a transport error.
pub const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);
