//! C12 — representative tool handlers wired against C9's cache-first API
//! (§4.12's "mutating handlers go through C9, never C2 directly"). Only a
//! representative subset is registered; the full tool catalog is this
//! workspace's declared Non-goal.
//!
//! Grounded on `original_source/skills/telegram/tools.py`'s
//! tool name/argument shapes, carried over field-for-field.

use std::sync::Arc;

use relay_core::types::ChatId;
use relay_protocol::tool::{ToolResult, ToolSpec};
use relay_runtime::{CacheFirstApi, ToolRegistry};
use serde_json::{json, Value};

use crate::client::TelegramClient;

pub fn build_registry(api: Arc<CacheFirstApi<TelegramClient>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    {
        let api = api.clone();
        registry.register(
            ToolSpec {
                name: "get_chats".to_string(),
                description: "List known chats, most recently active first.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "limit": { "type": "integer", "default": 50 } }
                }),
            },
            Arc::new(move |args: Value| {
                let api = api.clone();
                Box::pin(async move {
                    let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(50) as u32;
                    match api.get_chats(limit).await {
                        Ok(result) => ToolResult::json(json!({
                            "chats": result.data,
                            "from_cache": result.from_cache,
                        })),
                        Err(e) => ToolResult::error(e.to_string()),
                    }
                })
            }),
        );
    }

    {
        let api = api.clone();
        registry.register(
            ToolSpec {
                name: "get_chat".to_string(),
                description: "Fetch one chat by id.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "chat_id": { "type": "string" } },
                    "required": ["chat_id"]
                }),
            },
            Arc::new(move |args: Value| {
                let api = api.clone();
                Box::pin(async move {
                    let Some(chat_id) = args.get("chat_id").and_then(|v| v.as_str()) else {
                        return ToolResult::error("missing required argument: chat_id");
                    };
                    match api.get_chat(&ChatId::from(chat_id)).await {
                        Ok(result) => ToolResult::json(json!({
                            "chat": result.data,
                            "from_cache": result.from_cache,
                        })),
                        Err(e) => ToolResult::error(e.to_string()),
                    }
                })
            }),
        );
    }

    {
        let api = api.clone();
        registry.register(
            ToolSpec {
                name: "get_messages".to_string(),
                description: "List recent messages in a chat.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "chat_id": { "type": "string" },
                        "limit": { "type": "integer", "default": 50 }
                    },
                    "required": ["chat_id"]
                }),
            },
            Arc::new(move |args: Value| {
                let api = api.clone();
                Box::pin(async move {
                    let Some(chat_id) = args.get("chat_id").and_then(|v| v.as_str()) else {
                        return ToolResult::error("missing required argument: chat_id");
                    };
                    let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(50) as u32;
                    match api.get_messages(&ChatId::from(chat_id), limit).await {
                        Ok(result) => ToolResult::json(json!({
                            "messages": result.data,
                            "from_cache": result.from_cache,
                        })),
                        Err(e) => ToolResult::error(e.to_string()),
                    }
                })
            }),
        );
    }

    {
        let api = api.clone();
        registry.register(
            ToolSpec {
                name: "send_message".to_string(),
                description: "Send a text message to a chat.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "chat_id": { "type": "string" },
                        "text": { "type": "string" }
                    },
                    "required": ["chat_id", "text"]
                }),
            },
            Arc::new(move |args: Value| {
                let api = api.clone();
                Box::pin(async move {
                    let (Some(chat_id), Some(text)) = (
                        args.get("chat_id").and_then(|v| v.as_str()),
                        args.get("text").and_then(|v| v.as_str()),
                    ) else {
                        return ToolResult::error("missing required argument: chat_id or text");
                    };
                    match api.send_message(&ChatId::from(chat_id), text).await {
                        Ok(message) => ToolResult::json(json!({ "message": message })),
                        Err(e) => ToolResult::error(e.to_string()),
                    }
                })
            }),
        );
    }

    {
        let api = api.clone();
        registry.register(
            ToolSpec {
                name: "mark_read".to_string(),
                description: "Mark a chat as read.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "chat_id": { "type": "string" } },
                    "required": ["chat_id"]
                }),
            },
            Arc::new(move |args: Value| {
                let api = api.clone();
                Box::pin(async move {
                    let Some(chat_id) = args.get("chat_id").and_then(|v| v.as_str()) else {
                        return ToolResult::error("missing required argument: chat_id");
                    };
                    match api.mark_read(&ChatId::from(chat_id)).await {
                        Ok(()) => ToolResult::text("ok"),
                        Err(e) => ToolResult::error(e.to_string()),
                    }
                })
            }),
        );
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::config::RateLimitConfig;
    use relay_core::ratelimit::RateLimiter;
    use relay_store::{DurableStore, StateStore};

    fn test_api() -> Arc<CacheFirstApi<TelegramClient>> {
        Arc::new(CacheFirstApi::new(
            Arc::new(TelegramClient::new("123:test")),
            Arc::new(StateStore::new(200)),
            Arc::new(DurableStore::open_in_memory().unwrap()),
            Arc::new(RateLimiter::new(RateLimitConfig {
                api_read_interval_ms: 0,
                api_write_interval_ms: 0,
                retry_cap: 0,
                flood_wait_max_secs: 60,
            })),
            0,
        ))
    }

    #[tokio::test]
    async fn registers_the_representative_tool_set() {
        let registry = build_registry(test_api());
        let names: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert!(names.contains(&"get_chats".to_string()));
        assert!(names.contains(&"send_message".to_string()));
        assert!(names.contains(&"mark_read".to_string()));
    }

    #[tokio::test]
    async fn get_chat_without_chat_id_is_an_error() {
        let registry = build_registry(test_api());
        let result = registry.dispatch("get_chat", json!({})).await;
        assert!(result.is_error);
    }
}
