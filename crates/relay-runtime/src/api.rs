//! C9 — Cache-First API. A generic façade over any [`ApiClient`]: every
//! read consults C2 first and only calls through to the client on a
//! miss; every write calls through unconditionally and then applies the
//! expected effect to C2/C3 synchronously so a following read observes
//! it without waiting for the echoed ingest event (§4.9).
//!
//! Grounded on `original_source/skills/telegram/api/chat_api.py`'s
//! `ApiResult[T]{data, from_cache}` shape and cache-then-fetch control
//! flow — carried over field-for-field, generalized from Telethon calls
//! to the `ApiClient` trait.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relay_core::error::{Result, SkillError};
use relay_core::ratelimit::{RateLimiter, Tier};
use relay_core::types::ChatId;
use relay_store::types::{Chat, ChatKind, Message, User};
use relay_store::{DurableStore, StateStore};

use crate::client::ApiClient;

/// Every cache-first read returns this: the data plus whether it came
/// from C2 (`from_cache = true`) or required a round-trip through C6
/// (`from_cache = false`).
#[derive(Debug, Clone)]
pub struct ApiResult<T> {
    pub data: T,
    pub from_cache: bool,
}

/// Generic cache-first façade, parameterized over the concrete adapter
/// `A`. `relay-telegram` supplies `A = TelegramClient`; other skills
/// would supply their own without touching this module.
pub struct CacheFirstApi<A: ApiClient> {
    client: Arc<A>,
    store: Arc<StateStore>,
    durable: Arc<DurableStore>,
    limiter: Arc<RateLimiter>,
    retry_cap: u32,
}

impl<A: ApiClient> CacheFirstApi<A> {
    pub fn new(
        client: Arc<A>,
        store: Arc<StateStore>,
        durable: Arc<DurableStore>,
        limiter: Arc<RateLimiter>,
        retry_cap: u32,
    ) -> Self {
        Self {
            client,
            store,
            durable,
            limiter,
            retry_cap,
        }
    }

    /// Acquire `tier`, invoke `f`, and on `RateLimited{retry_after}`
    /// sleep for the directed duration and retry — up to `retry_cap`
    /// times (§9 open question, resolved uniformly to K=3). A
    /// flood-wait beyond the configured cap is propagated rather than
    /// slept through (§6 rate-limit directives).
    async fn call_with_retry<T, F, Fut>(&self, tier: Tier, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts: u32 = 0;
        loop {
            self.limiter.acquire(tier).await;
            match f().await {
                Ok(v) => return Ok(v),
                Err(SkillError::RateLimited { retry_after }) => {
                    attempts += 1;
                    if attempts > self.retry_cap {
                        return Err(SkillError::RateLimited { retry_after });
                    }
                    let secs = retry_after.map(|d| d.as_secs()).unwrap_or(1);
                    match self.limiter.sleep_for_flood_wait(secs).await {
                        Ok(()) => continue,
                        Err(over_cap) => {
                            return Err(SkillError::RateLimited {
                                retry_after: Some(Duration::from_secs(over_cap)),
                            })
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// (inputs: `limit`) (rate tier: `api_read`) (cache keys consulted:
    /// `chats_order`) (cache keys invalidated: none — a miss populates
    /// `chats`/`chats_order`/C3 `chats`) (error map: `Transient`,
    /// `RateLimited` bubble after retry exhaustion; `Auth` surfaces
    /// unchanged).
    pub async fn get_chats(&self, limit: u32) -> Result<ApiResult<Vec<Chat>>> {
        let order = self.store.chats_order();
        if !order.is_empty() {
            let data = order
                .into_iter()
                .take(limit as usize)
                .filter_map(|id| self.store.get_chat(&id))
                .collect();
            return Ok(ApiResult {
                data,
                from_cache: true,
            });
        }

        let chats = self
            .call_with_retry(Tier::ApiRead, || self.client.fetch_chats(limit))
            .await?;
        self.store.add_chats(chats.clone());
        self.durable.upsert_chats(&chats)?;
        Ok(ApiResult {
            data: chats,
            from_cache: false,
        })
    }

    /// (inputs: `id`) (rate tier: `api_read`) (cache keys consulted:
    /// `chats[id]`) (cache keys invalidated: none) (error map:
    /// `NotFound` if the client has no such chat, otherwise as
    /// `get_chats`).
    pub async fn get_chat(&self, id: &ChatId) -> Result<ApiResult<Chat>> {
        if let Some(chat) = self.store.get_chat(id) {
            return Ok(ApiResult {
                data: chat,
                from_cache: true,
            });
        }

        let chat = self
            .call_with_retry(Tier::ApiRead, || self.client.fetch_chat(id))
            .await?;
        self.store.add_chats(vec![chat.clone()]);
        self.durable.upsert_chat(&chat)?;
        Ok(ApiResult {
            data: chat,
            from_cache: false,
        })
    }

    /// (inputs: `chat_id`, `limit`) (rate tier: `api_read`) (cache keys
    /// consulted: `messages[chat_id]`) (cache keys invalidated: none)
    /// (error map: as `get_chats`).
    pub async fn get_messages(&self, chat_id: &ChatId, limit: u32) -> Result<ApiResult<Vec<Message>>> {
        let cached = self.store.messages(chat_id);
        if !cached.is_empty() {
            return Ok(ApiResult {
                data: cached,
                from_cache: true,
            });
        }

        let messages = self
            .call_with_retry(Tier::ApiRead, || self.client.fetch_messages(chat_id, limit))
            .await?;
        self.store.add_messages(chat_id, messages.clone());
        self.durable.upsert_messages(&messages)?;
        Ok(ApiResult {
            data: messages,
            from_cache: false,
        })
    }

    /// Writes skip the cache check and always round-trip (§4.9). (inputs:
    /// `chat_id`, `text`) (rate tier: `api_write`) (cache keys
    /// invalidated: `messages[chat_id]`, `chats[chat_id].last_message*`)
    /// (error map: `Validation` for empty text, otherwise as `get_chats`).
    pub async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(SkillError::Validation("message text must not be empty".into()));
        }

        let message = self
            .call_with_retry(Tier::ApiWrite, || self.client.send_message(chat_id, text))
            .await?;

        self.store.add_messages(chat_id, vec![message.clone()]);
        self.durable.upsert_message(&message)?;
        self.store.update_chat(chat_id, |chat| {
            chat.last_message_id = Some(message.id);
            chat.last_message_date = Some(message.date);
        });
        if let Some(chat) = self.store.get_chat(chat_id) {
            self.durable.upsert_chat(&chat)?;
        }
        Ok(message)
    }

    /// (inputs: `chat_id`) (rate tier: `api_write`) (cache keys
    /// invalidated: `chats[chat_id].unread_count`) (error map: as
    /// `get_chats`). Resets to `0` optimistically. Invariant I4's
    /// server-authoritative `still_unread_count` correction is a
    /// read-receipt push (`UpdateReadHistoryInbox`/`UpdateReadChannelInbox`)
    /// that only exists on MTProto; the Bot API this adapter polls has no
    /// equivalent update, so the optimistic zero here is never overwritten
    /// — it stands until the next full chat refetch replaces it wholesale.
    pub async fn mark_read(&self, chat_id: &ChatId) -> Result<()> {
        self.call_with_retry(Tier::ApiWrite, || self.client.mark_read(chat_id))
            .await?;
        self.store.update_chat(chat_id, |chat| chat.unread_count = 0);
        if let Some(chat) = self.store.get_chat(chat_id) {
            self.durable.upsert_chat(&chat)?;
        }
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.store.get_state().current_user
    }

    pub fn is_dm(kind: ChatKind) -> bool {
        matches!(kind, ChatKind::Dm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::types::MessageId;
    use relay_store::types::{ChatKind, UserStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct CountingClient {
        read_calls: AtomicUsize,
        flaky_then_ok: AtomicUsize,
    }

    #[async_trait]
    impl ApiClient for CountingClient {
        async fn connect(&self) -> Result<User> {
            Ok(sample_user())
        }
        async fn disconnect(&self) {}
        async fn fetch_chats(&self, _limit: u32) -> Result<Vec<Chat>> {
            self.read_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![sample_chat()])
        }
        async fn fetch_chat(&self, _id: &ChatId) -> Result<Chat> {
            Ok(sample_chat())
        }
        async fn fetch_messages(&self, _chat_id: &ChatId, _limit: u32) -> Result<Vec<Message>> {
            let attempt = self.flaky_then_ok.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 {
                return Err(SkillError::RateLimited {
                    retry_after: Some(Duration::from_millis(5)),
                });
            }
            Ok(vec![])
        }
        async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<Message> {
            Ok(Message {
                id: MessageId(1),
                chat_id: chat_id.clone(),
                from_id: None,
                date: chrono::Utc::now(),
                text: text.to_string(),
                is_outgoing: true,
                is_edited: false,
                reply_to_id: None,
                media_kind: None,
                reactions: vec![],
            })
        }
        async fn mark_read(&self, _chat_id: &ChatId) -> Result<()> {
            Ok(())
        }
        fn spawn_ingest(
            self: Arc<Self>,
            _deps: crate::client::IngestDeps,
            _cancel: CancellationToken,
        ) -> tokio::task::JoinHandle<()> {
            tokio::spawn(async {})
        }
    }

    fn sample_chat() -> Chat {
        Chat {
            id: ChatId::from("1"),
            kind: ChatKind::Dm,
            title: "Alice".to_string(),
            unread_count: 2,
            participants_count: None,
            is_pinned: false,
            is_muted: false,
            is_archived: false,
            draft: None,
            last_message_id: None,
            last_message_date: None,
            sort_order: 0,
            updated_at: chrono::Utc::now(),
        }
    }

    fn sample_user() -> User {
        User {
            id: relay_core::types::UserId::from("7"),
            first_name: Some("Alice".to_string()),
            last_name: None,
            username: None,
            phone: None,
            is_bot: false,
            is_self: true,
            status: UserStatus::Unknown,
            updated_at: chrono::Utc::now(),
        }
    }

    fn test_api(client: Arc<CountingClient>) -> CacheFirstApi<CountingClient> {
        CacheFirstApi::new(
            client,
            Arc::new(StateStore::new(200)),
            Arc::new(DurableStore::open_in_memory().unwrap()),
            Arc::new(RateLimiter::new(relay_core::config::RateLimitConfig {
                api_read_interval_ms: 0,
                api_write_interval_ms: 0,
                retry_cap: 3,
                flood_wait_max_secs: 60,
            })),
            3,
        )
    }

    #[tokio::test]
    async fn second_get_chats_is_served_from_cache() {
        let client = Arc::new(CountingClient {
            read_calls: AtomicUsize::new(0),
            flaky_then_ok: AtomicUsize::new(0),
        });
        let api = test_api(client.clone());

        let first = api.get_chats(10).await.unwrap();
        assert!(!first.from_cache);
        let second = api.get_chats(10).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(client.read_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limited_call_retries_until_success() {
        let client = Arc::new(CountingClient {
            read_calls: AtomicUsize::new(0),
            flaky_then_ok: AtomicUsize::new(0),
        });
        let api = test_api(client);
        let result = api.get_messages(&ChatId::from("1"), 10).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn send_message_rejects_empty_text() {
        let client = Arc::new(CountingClient {
            read_calls: AtomicUsize::new(0),
            flaky_then_ok: AtomicUsize::new(0),
        });
        let api = test_api(client);
        let result = api.send_message(&ChatId::from("1"), "   ").await;
        assert!(matches!(result, Err(SkillError::Validation(_))));
    }
}
