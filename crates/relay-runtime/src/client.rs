//! The C6 API Client Adapter contract (§4.6).
//!
//! `relay-runtime` never speaks a concrete external protocol — it only
//! knows the shape every skill's adapter must honor, so C9 (`api`) and
//! C10 (`lifecycle`) can stay generic across Telegram/Slack/Otter-style
//! skills. `relay-telegram::adapter::TelegramClient` is the one
//! implementation shipped in this workspace.
//!
//! Grounded on `skynet-channels::channel::Channel`'s trait
//! boundary, generalized from "a chat channel adapter" to "an external
//! API client adapter".

use std::sync::Arc;

use async_trait::async_trait;
use relay_core::error::Result;
use relay_core::types::ChatId;
use relay_host::Host;
use relay_store::types::{Chat, Message, User};
use relay_store::{DurableStore, StateStore};
use tokio_util::sync::CancellationToken;

use crate::triggers::TriggerRegistry;

/// Dependencies an adapter's ingest task (C8, implemented per-skill)
/// needs to fan events out to C2/C3/C5, per §2's ingest data flow:
/// `External service → C6 → C7 → C8 → (C2, C3, C5)`. `triggers` adds the
/// §4.8 step-5 evaluation surface: the adapter evaluates each event
/// against it and reports matches via `Host::fire_trigger`.
pub struct IngestDeps {
    pub store: Arc<StateStore>,
    pub durable: Arc<DurableStore>,
    pub host: Arc<dyn Host>,
    pub triggers: Arc<TriggerRegistry>,
}

/// The smallest surface C9 (cache-first API) and C10 (lifecycle
/// controller) need from an external service's SDK (§4.6).
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    /// Authenticate using persisted credentials and resolve the current
    /// user. Errors as `SkillError::Auth` route the lifecycle controller
    /// to the setup wizard rather than a reconnect loop.
    async fn connect(&self) -> Result<User>;

    /// Tear down the live connection. Called from `unload`/`disconnect`;
    /// never fails — best-effort per §4.10.
    async fn disconnect(&self);

    async fn fetch_chats(&self, limit: u32) -> Result<Vec<Chat>>;
    async fn fetch_chat(&self, id: &ChatId) -> Result<Chat>;
    async fn fetch_messages(&self, chat_id: &ChatId, limit: u32) -> Result<Vec<Message>>;
    async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<Message>;
    async fn mark_read(&self, chat_id: &ChatId) -> Result<()>;

    /// Spawn the live update-ingest task (C8). The adapter owns the
    /// translation (C7) and event loop entirely; this trait only needs
    /// to know how to start and stop it. `cancel` is observed by the
    /// task per §5's structured-cancellation rule: it finishes its
    /// current event transaction and exits rather than aborting
    /// mid-write.
    fn spawn_ingest(
        self: Arc<Self>,
        deps: IngestDeps,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()>;
}
