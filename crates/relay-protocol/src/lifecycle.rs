//! Inbound RPC payload/result shapes (§6) that aren't setup, entity, or
//! tool related: `load`, `status`, and trigger registration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters passed to `load(params)`. `credentials` carries whatever
/// the skill's `config.json` held (absent ⇒ lifecycle enters the setup
/// wizard instead of connecting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadParams {
    pub data_dir: String,
    #[serde(default)]
    pub credentials: Option<Value>,
    #[serde(default)]
    pub tool_categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Unauthenticated,
    Authenticated,
    Expired,
}

/// Result of `status()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillStatus {
    pub connection_status: ConnectionStatus,
    pub auth_status: AuthStatus,
    pub initialized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// In-memory-only trigger definition (§3 `Trigger`). Never persisted —
/// re-registered by the host on every `load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub config: Value,
    pub predicate: Value,
}
