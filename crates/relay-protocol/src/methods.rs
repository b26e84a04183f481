//! Well-known Host↔Skill RPC method names (§6).
//!
//! Centralized as constants rather than scattered string literals,
//! following `skynet-protocol::methods`'s convention.

// Inbound (host calls skill)
pub const LOAD: &str = "load";
pub const UNLOAD: &str = "unload";
pub const TICK: &str = "tick";
pub const STATUS: &str = "status";
pub const SETUP_START: &str = "setup_start";
pub const SETUP_SUBMIT: &str = "setup_submit";
pub const SETUP_CANCEL: &str = "setup_cancel";
pub const CALL_TOOL: &str = "call_tool";
pub const TRIGGER_REGISTER: &str = "trigger_register";
pub const TRIGGER_REMOVE: &str = "trigger_remove";
pub const DISCONNECT: &str = "disconnect";

// Outbound (skill calls host)
pub const SET_STATE: &str = "set_state";
pub const READ_DATA: &str = "read_data";
pub const WRITE_DATA: &str = "write_data";
pub const UPSERT_ENTITY: &str = "upsert_entity";
pub const UPSERT_RELATIONSHIP: &str = "upsert_relationship";
pub const FIRE_TRIGGER: &str = "fire_trigger";
pub const PUSH_EVENT: &str = "push_event";
