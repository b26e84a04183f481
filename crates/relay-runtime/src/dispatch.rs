//! C12 — Tool Dispatch (§4.12). A name → handler registry returning a
//! uniform `ToolResult` envelope. Handlers never mutate C2 directly —
//! every mutating handler goes through C9 so C3 stays in sync (§4.12
//! rule). Unknown names return `is_error = true` rather than panicking
//! or erroring the transport.
//!
//! Grounded on `tools.py`'s `ALL_TOOLS` list plus
//! `handlers.py::dispatch_tool`'s name-lookup-then-call shape. Only a
//! representative subset of handlers is registered here — the catalog
//! of 150+ individual tool handlers is this crate's declared Non-goal;
//! the dispatch contract itself is fully implemented.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use relay_protocol::tool::{ToolResult, ToolSpec};
use serde_json::Value;

pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;
pub type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Registry populated at lifecycle `load` time, once the cache-first API
/// and its dependencies exist; torn down on `unload`.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, (ToolSpec, ToolHandler)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ToolSpec, handler: ToolHandler) {
        self.handlers.insert(spec.name.clone(), (spec, handler));
    }

    pub fn list(&self) -> Vec<ToolSpec> {
        self.handlers.values().map(|(spec, _)| spec.clone()).collect()
    }

    /// `call_tool(name, args) -> ToolResult`. Unknown tool names return
    /// `is_error = true` rather than propagating as a transport error
    /// (§6, scenario S4).
    pub async fn dispatch(&self, name: &str, args: Value) -> ToolResult {
        match self.handlers.get(name) {
            Some((_, handler)) => handler(args).await,
            None => ToolResult::error(format!("Unknown tool: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_tool_name_is_an_error_result() {
        let registry = ToolRegistry::new();
        let result = registry.dispatch("nope", serde_json::json!({})).await;
        assert!(result.is_error);
        match &result.content[0] {
            relay_protocol::tool::ToolContent::Text { text } => {
                assert_eq!(text, "Unknown tool: nope");
            }
            _ => panic!("expected text content"),
        }
    }

    #[tokio::test]
    async fn registered_tool_dispatches() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolSpec {
                name: "ping".to_string(),
                description: "replies pong".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            },
            Arc::new(|_args| Box::pin(async { ToolResult::text("pong") })),
        );
        let result = registry.dispatch("ping", serde_json::json!({})).await;
        assert!(!result.is_error);
    }
}
