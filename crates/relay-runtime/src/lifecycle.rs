//! C10 — Lifecycle Controller (§4.10). Owns every other component for
//! one skill session and drives the state machine:
//!
//! ```text
//!     unloaded ─load─▶ initializing ─creds ok─▶ connecting
//!       ▲                    │
//!       │                  no creds
//!       │                    ▼
//!       │               setup-wizard (C11) ──on complete──▶ connecting
//!       │                    │
//!   unloaded ◀─unload── ready ◀── syncing ◀── connecting
//!                           │          │
//!                         tick     lost connection
//!                           │          │
//!                           └──────────┴─▶ backoff-reconnect ─▶ connecting
//! ```
//!
//! Generic over `A: ApiClient` so this crate carries no compile-time
//! Telegram dependency; `relay-telegram` (or any other skill adapter)
//! supplies the client builder, the setup steps, and the tool registry
//! builder at construction time. Grounded on
//! `skynet-channels::manager::ChannelManager::connect_with_backoff`'s
//! bounded-retry shape, generalized from "reconnect one channel" to
//! "drive one skill's full session state machine".

use std::sync::Arc;
use std::time::Duration;

use relay_core::config::{RateLimitConfig, RECONNECT_CAP_SECS, RECONNECT_FACTOR, RECONNECT_INITIAL_SECS};
use relay_core::error::{Result, SkillError};
use relay_core::ratelimit::RateLimiter;
use relay_host::{EntityEmitter, Host, HostMirror};
use relay_protocol::lifecycle::{
    AuthStatus, ConnectionStatus as WireConnectionStatus, LoadParams, SkillStatus, Trigger,
};
use relay_protocol::setup::{SetupResult, SetupStatus};
use relay_protocol::tool::ToolResult;
use relay_store::{ConnectionStatus, DurableStore, StateStore};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::CacheFirstApi;
use crate::client::{ApiClient, IngestDeps};
use crate::dispatch::ToolRegistry;
use crate::setup::{SetupStepHandler, SetupWizardEngine, WriteConfigCompletion};
use crate::summary::SummaryScheduler;
use crate::triggers::TriggerRegistry;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Initializing,
    Connecting,
    SetupWizard,
    Syncing,
    Ready,
    BackoffReconnect,
    Draining,
}

/// Builds the concrete client from credentials read out of `load(params)`
/// or written by the setup wizard. An `Auth` error routes the controller
/// to the setup wizard instead of the reconnect loop; any other error
/// routes to `BackoffReconnect`.
pub type ClientBuilder<A> = Box<dyn Fn(&Value) -> Result<Arc<A>> + Send + Sync>;

/// Builds this skill's tool registry once a cache-first API exists.
/// Owned by the adapter crate (§4.12: C12 lives in `relay-runtime` +
/// `relay-telegram`) — this crate only defines the registry shape.
pub type ToolRegistryBuilder<A> = Box<dyn Fn(Arc<CacheFirstApi<A>>) -> ToolRegistry + Send + Sync>;

struct RunningSession<A: ApiClient> {
    client: Arc<A>,
    api: Arc<CacheFirstApi<A>>,
    tools: ToolRegistry,
    summary: SummaryScheduler,
    ingest_cancel: CancellationToken,
    ingest_handle: JoinHandle<()>,
    _mirror: HostMirror,
}

pub struct LifecycleController<A: ApiClient> {
    state: Mutex<LifecycleState>,
    store: Arc<StateStore>,
    durable: Mutex<Option<Arc<DurableStore>>>,
    host: Arc<dyn Host>,
    limiter: Arc<RateLimiter>,
    retry_cap: u32,
    retention_days: i64,
    build_client: ClientBuilder<A>,
    build_tools: ToolRegistryBuilder<A>,
    setup: SetupWizardEngine,
    pending_credentials: Arc<Mutex<Option<Value>>>,
    session: Mutex<Option<RunningSession<A>>>,
    last_error: Mutex<Option<String>>,
    reconnect_cancel: Mutex<Option<CancellationToken>>,
    triggers: Arc<TriggerRegistry>,
}

impl<A: ApiClient> LifecycleController<A> {
    pub fn new(
        host: Arc<dyn Host>,
        message_buffer_size: usize,
        rate_limit_cfg: RateLimitConfig,
        retry_cap: u32,
        retention_days: i64,
        setup_steps: Vec<Box<dyn SetupStepHandler>>,
        build_client: ClientBuilder<A>,
        build_tools: ToolRegistryBuilder<A>,
    ) -> Self {
        let pending_credentials = Arc::new(Mutex::new(None));
        let completion = Arc::new(CapturingCompletion {
            inner: WriteConfigCompletion { host: host.clone() },
            pending: pending_credentials.clone(),
        });
        Self {
            state: Mutex::new(LifecycleState::Unloaded),
            store: Arc::new(StateStore::new(message_buffer_size)),
            durable: Mutex::new(None),
            host,
            limiter: Arc::new(RateLimiter::new(rate_limit_cfg)),
            retry_cap,
            retention_days,
            build_client,
            build_tools,
            setup: SetupWizardEngine::new(setup_steps, completion),
            pending_credentials,
            session: Mutex::new(None),
            last_error: Mutex::new(None),
            reconnect_cancel: Mutex::new(None),
            triggers: Arc::new(TriggerRegistry::new()),
        }
    }

    /// `load(params)` (§4.10). Opens C3, restores C2 from it, and either
    /// connects immediately (credentials present) or waits for the
    /// setup wizard.
    pub async fn load(&self, params: LoadParams) -> SkillStatus {
        *self.state.lock().await = LifecycleState::Initializing;
        self.store.set_initialized(true);

        let durable = match DurableStore::open(&format!("{}/relay.sqlite3", params.data_dir)) {
            Ok(d) => Arc::new(d),
            Err(e) => {
                warn!(error = %e, "lifecycle: failed to open durable store");
                *self.last_error.lock().await = Some(e.to_string());
                *self.state.lock().await = LifecycleState::Unloaded;
                return self.status().await;
            }
        };
        if let Ok(chats) = durable.list_chats() {
            self.store.add_chats(chats);
        }
        *self.durable.lock().await = Some(durable);

        match params.credentials {
            Some(creds) => self.connect_and_sync(creds).await,
            None => {
                *self.state.lock().await = LifecycleState::SetupWizard;
                self.store.set_connection_status(ConnectionStatus::Disconnected);
            }
        }
        self.status().await
    }

    async fn connect_and_sync(&self, credentials: Value) {
        *self.state.lock().await = LifecycleState::Connecting;
        self.store.set_connection_status(ConnectionStatus::Connecting);

        let client = match (self.build_client)(&credentials) {
            Ok(client) => client,
            Err(SkillError::Auth(msg)) => {
                warn!(error = %msg, "lifecycle: credentials rejected, routing to setup");
                *self.last_error.lock().await = Some(msg);
                *self.state.lock().await = LifecycleState::SetupWizard;
                return;
            }
            Err(e) => {
                warn!(error = %e, "lifecycle: failed to build client, entering backoff");
                *self.last_error.lock().await = Some(e.to_string());
                self.enter_backoff_reconnect(credentials).await;
                return;
            }
        };

        match client.connect().await {
            Ok(user) => {
                self.store.set_authenticated(true, Some(user.clone()));
                let emitter = EntityEmitter::new(self.host.as_ref());
                emitter.emit_user(&user).await;
                self.start_session(client).await;
            }
            Err(SkillError::Auth(msg)) => {
                warn!(error = %msg, "lifecycle: connect rejected credentials, routing to setup");
                *self.last_error.lock().await = Some(msg);
                *self.state.lock().await = LifecycleState::SetupWizard;
            }
            Err(e) => {
                warn!(error = %e, "lifecycle: connect failed, entering backoff");
                *self.last_error.lock().await = Some(e.to_string());
                self.enter_backoff_reconnect(credentials).await;
            }
        }
    }

    async fn start_session(&self, client: Arc<A>) {
        *self.state.lock().await = LifecycleState::Syncing;
        self.store.set_syncing(true);

        let durable = self.durable.lock().await.clone().expect("durable opened before connect");
        let limiter = self.limiter.clone();
        let api = Arc::new(CacheFirstApi::new(
            client.clone(),
            self.store.clone(),
            durable.clone(),
            limiter,
            self.retry_cap,
        ));

        if let Ok(chats) = api.get_chats(u32::MAX).await {
            for chat in &chats.data {
                let _ = api.get_messages(&chat.id, 200).await;
            }
        }
        self.store.set_initial_sync_complete();
        self.store.set_syncing(false);

        let tools = (self.build_tools)(api.clone());
        let summary = SummaryScheduler::new(durable.clone(), self.retention_days);
        let mirror = HostMirror::spawn(self.store.clone(), self.host.clone());

        let ingest_cancel = CancellationToken::new();
        let ingest_handle = client.clone().spawn_ingest(
            IngestDeps {
                store: self.store.clone(),
                durable: durable.clone(),
                host: self.host.clone(),
                triggers: self.triggers.clone(),
            },
            ingest_cancel.clone(),
        );

        *self.session.lock().await = Some(RunningSession {
            client,
            api,
            tools,
            summary,
            ingest_cancel,
            ingest_handle,
            _mirror: mirror,
        });

        *self.state.lock().await = LifecycleState::Ready;
        info!("lifecycle: session ready");
    }

    /// Bounded exponential backoff (§4.6, `RECONNECT_*` constants),
    /// generalized from `ChannelManager`'s per-channel reconnect loop to
    /// this controller's single session.
    async fn enter_backoff_reconnect(&self, credentials: Value) {
        *self.state.lock().await = LifecycleState::BackoffReconnect;
        self.store.set_connection_status(ConnectionStatus::Reconnecting);

        let cancel = CancellationToken::new();
        *self.reconnect_cancel.lock().await = Some(cancel.clone());

        let mut delay = Duration::from_secs(RECONNECT_INITIAL_SECS);
        let cap = Duration::from_secs(RECONNECT_CAP_SECS);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if *self.state.lock().await != LifecycleState::BackoffReconnect {
                return;
            }
            match (self.build_client)(&credentials) {
                Ok(client) => match client.connect().await {
                    Ok(user) => {
                        self.store.set_authenticated(true, Some(user.clone()));
                        let emitter = EntityEmitter::new(self.host.as_ref());
                        emitter.emit_user(&user).await;
                        self.start_session(client).await;
                        return;
                    }
                    Err(e) if e.is_retryable() => {
                        delay = (delay * RECONNECT_FACTOR).min(cap);
                    }
                    Err(SkillError::Auth(msg)) => {
                        *self.last_error.lock().await = Some(msg);
                        *self.state.lock().await = LifecycleState::SetupWizard;
                        return;
                    }
                    Err(e) => {
                        *self.last_error.lock().await = Some(e.to_string());
                        delay = (delay * RECONNECT_FACTOR).min(cap);
                    }
                },
                Err(_) => delay = (delay * RECONNECT_FACTOR).min(cap),
            }
        }
    }

    /// `tick(interval)` (§4.10): runs C13, prunes, and refreshes entity
    /// snapshots. A no-op outside `Ready`.
    pub async fn tick(&self) {
        if *self.state.lock().await != LifecycleState::Ready {
            return;
        }
        let session = self.session.lock().await;
        let Some(session) = session.as_ref() else {
            return;
        };
        let emitter = EntityEmitter::new(self.host.as_ref());
        match session.summary.run_tick(&emitter).await {
            Ok(summaries) => {
                if !summaries.is_empty() {
                    info!(count = summaries.len(), "lifecycle: tick produced summaries");
                }
            }
            Err(e) => warn!(error = %e, "lifecycle: summary tick failed"),
        }
    }

    /// `unload()` (§4.10): stop ingest, flush C3, close C6, reset C2,
    /// clear credentials iff `disconnect`. Cancellation is structured —
    /// ingest is asked to finish its current event and exit, with a 5 s
    /// drain budget before the task is aborted (§5).
    pub async fn unload(&self, disconnect: bool) {
        *self.state.lock().await = LifecycleState::Draining;

        if let Some(cancel) = self.reconnect_cancel.lock().await.take() {
            cancel.cancel();
        }

        if let Some(session) = self.session.lock().await.take() {
            session.ingest_cancel.cancel();
            if tokio::time::timeout(DRAIN_TIMEOUT, session.ingest_handle).await.is_err() {
                warn!("lifecycle: ingest task did not drain in time, abandoning");
            }
            session.client.disconnect().await;
        }

        self.store.reset();
        self.store.set_initialized(false);
        *self.durable.lock().await = None;

        if disconnect {
            let _ = self.host.write_data("config.json", b"{}").await;
        }

        *self.state.lock().await = LifecycleState::Unloaded;
    }

    pub async fn status(&self) -> SkillStatus {
        let state = *self.state.lock().await;
        let snapshot = self.store.get_state();
        SkillStatus {
            connection_status: match snapshot.connection_status {
                ConnectionStatus::Disconnected => WireConnectionStatus::Disconnected,
                ConnectionStatus::Connecting => WireConnectionStatus::Connecting,
                ConnectionStatus::Connected => WireConnectionStatus::Connected,
                ConnectionStatus::Reconnecting => WireConnectionStatus::Reconnecting,
            },
            auth_status: if snapshot.is_authenticated {
                AuthStatus::Authenticated
            } else {
                AuthStatus::Unauthenticated
            },
            initialized: state == LifecycleState::Ready,
            last_sync: snapshot.last_sync,
            current_user: snapshot
                .current_user
                .and_then(|u| serde_json::to_value(u).ok()),
            error: self.last_error.lock().await.clone(),
        }
    }

    pub async fn setup_start(&self) -> SetupResult {
        self.setup.start().await
    }

    /// On completion, proceeds straight into `connecting` with the
    /// freshly captured credentials rather than waiting for a second
    /// `load()` call (§4.10's "on complete" arrow leads to `connecting`,
    /// not back to `unloaded`).
    pub async fn setup_submit(&self, step_id: &str, values: Value) -> SetupResult {
        let result = self.setup.submit(step_id, values).await;
        if result.status == SetupStatus::Complete {
            if let Some(credentials) = self.pending_credentials.lock().await.take() {
                self.connect_and_sync(credentials).await;
            }
        }
        result
    }

    pub async fn setup_cancel(&self) {
        self.setup.cancel().await;
    }

    /// `trigger_register(trigger)` (§6). Triggers are re-registered by
    /// the host on every `load` — there is no persistence here by
    /// design (§3 `Trigger`: "stored only in memory").
    pub fn trigger_register(&self, trigger: Trigger) {
        self.triggers.register(trigger);
    }

    pub fn trigger_remove(&self, trigger_id: &str) {
        self.triggers.remove(trigger_id);
    }

    pub async fn call_tool(&self, name: &str, args: Value) -> ToolResult {
        let session = self.session.lock().await;
        match session.as_ref() {
            Some(session) => session.tools.dispatch(name, args).await,
            None => ToolResult::error("skill is not ready"),
        }
    }

    pub fn store(&self) -> Arc<StateStore> {
        self.store.clone()
    }
}

/// Wraps [`WriteConfigCompletion`] to also stash the completed
/// credentials so `setup_submit` can drive the state machine onward
/// without a second `load()` round-trip.
struct CapturingCompletion {
    inner: WriteConfigCompletion,
    pending: Arc<Mutex<Option<Value>>>,
}

#[async_trait::async_trait]
impl crate::setup::SetupCompletion for CapturingCompletion {
    async fn complete(&self, transient: &Value) -> std::result::Result<String, String> {
        let message = self.inner.complete(transient).await?;
        *self.pending.lock().await = Some(transient.clone());
        Ok(message)
    }
}
