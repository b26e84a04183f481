//! The outbound half of the Host↔Skill RPC (§6) — calls the skill makes
//! into the host process. Generalized from the
//! `skynet-channels::channel::Channel` trait boundary: one adapter
//! trait other components depend on as `Arc<dyn Host>`, so `relay-runtime`
//! and `relay-telegram` never know whether they're talking to a real
//! host process or (in tests / `relay-runner`) a stdio bridge.

use async_trait::async_trait;
use relay_protocol::entity::{Entity, Relationship};
use serde_json::Value;

use crate::error::HostError;

#[async_trait]
pub trait Host: Send + Sync {
    /// Debounced host mirror push (C4). `partial` is a JSON merge-patch
    /// against the host's projection of this skill's state.
    async fn set_state(&self, partial: Value) -> Result<(), HostError>;

    /// Read a config-adjacent blob the host persists on the skill's
    /// behalf. Returns `None` if the path has never been written.
    async fn read_data(&self, path: &str) -> Result<Option<Vec<u8>>, HostError>;

    async fn write_data(&self, path: &str, bytes: &[u8]) -> Result<(), HostError>;

    /// Idempotent on `(source, source_id)` — the host is expected to
    /// merge, not duplicate (§4.5).
    async fn upsert_entity(&self, entity: Entity) -> Result<(), HostError>;

    async fn upsert_relationship(&self, relationship: Relationship) -> Result<(), HostError>;

    async fn fire_trigger(&self, trigger_id: &str, event_payload: Value) -> Result<(), HostError>;

    /// Opaque pass-through to the host timeline.
    async fn push_event(&self, event_type: &str, payload: Value) -> Result<(), HostError>;
}
