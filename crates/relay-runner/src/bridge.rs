//! Stdio realization of the outbound Host↔Skill RPC (§6). Every
//! `Host` method either reads/writes a file under `data_dir` (`read_data`,
//! `write_data` — the §6 persisted state layout) or writes one
//! newline-delimited `EventFrame` to stdout (everything else), so a
//! human or a test harness driving this process over stdin/stdout sees
//! every push the skill would otherwise send a real host process.
//!
//! Grounded on `relay_protocol::frames`'s envelope (itself carried over
//! from `skynet-protocol::frames`'s req/res/event shape) and on
//! `server.py::run_server`'s stdio-transport entry point.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use relay_host::{Host, HostError};
use relay_protocol::entity::{Entity, Relationship};
use relay_protocol::frames::EventFrame;
use serde_json::Value;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Shared, line-buffered stdout writer. A single mutex serializes every
/// write — both the RPC response loop in `main.rs` and this bridge's
/// unsolicited event pushes share it, so frames never interleave
/// mid-line on a concurrently-written stdout.
pub struct StdoutWriter {
    stdout: Mutex<Stdout>,
}

impl StdoutWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stdout: Mutex::new(tokio::io::stdout()),
        })
    }

    pub async fn write_line(&self, line: &str) {
        let mut stdout = self.stdout.lock().await;
        if stdout.write_all(line.as_bytes()).await.is_ok() {
            let _ = stdout.write_all(b"\n").await;
            let _ = stdout.flush().await;
        }
    }
}

pub struct StdioHost {
    /// Set from each `load` request's `data_dir` field — this bridge is
    /// constructed before the first `load` frame arrives, so the real
    /// directory is not known until then.
    data_dir: tokio::sync::RwLock<PathBuf>,
    writer: Arc<StdoutWriter>,
}

impl StdioHost {
    pub fn new(writer: Arc<StdoutWriter>) -> Self {
        Self {
            data_dir: tokio::sync::RwLock::new(PathBuf::from(".")),
            writer,
        }
    }

    pub async fn set_data_dir(&self, dir: PathBuf) {
        *self.data_dir.write().await = dir;
    }

    async fn push_event_frame(&self, event: &str, payload: impl serde::Serialize) {
        let frame = EventFrame::new(event, payload);
        match serde_json::to_string(&frame) {
            Ok(line) => self.writer.write_line(&line).await,
            Err(e) => tracing::warn!(error = %e, event, "stdio host: failed to serialize event frame"),
        }
    }
}

#[async_trait]
impl Host for StdioHost {
    async fn set_state(&self, partial: Value) -> Result<(), HostError> {
        self.push_event_frame("set_state", partial).await;
        Ok(())
    }

    async fn read_data(&self, path: &str) -> Result<Option<Vec<u8>>, HostError> {
        let dir = self.data_dir.read().await.clone();
        match tokio::fs::read(dir.join(path)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HostError::CallFailed(e.to_string())),
        }
    }

    async fn write_data(&self, path: &str, bytes: &[u8]) -> Result<(), HostError> {
        let dir = self.data_dir.read().await.clone();
        let full_path = dir.join(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HostError::CallFailed(e.to_string()))?;
        }
        tokio::fs::write(&full_path, bytes)
            .await
            .map_err(|e| HostError::CallFailed(e.to_string()))
    }

    async fn upsert_entity(&self, entity: Entity) -> Result<(), HostError> {
        self.push_event_frame("upsert_entity", entity).await;
        Ok(())
    }

    async fn upsert_relationship(&self, relationship: Relationship) -> Result<(), HostError> {
        self.push_event_frame("upsert_relationship", relationship).await;
        Ok(())
    }

    async fn fire_trigger(&self, trigger_id: &str, event_payload: Value) -> Result<(), HostError> {
        self.push_event_frame(
            "fire_trigger",
            serde_json::json!({ "trigger_id": trigger_id, "payload": event_payload }),
        )
        .await;
        Ok(())
    }

    async fn push_event(&self, event_type: &str, payload: Value) -> Result<(), HostError> {
        self.push_event_frame(
            "push_event",
            serde_json::json!({ "event_type": event_type, "payload": payload }),
        )
        .await;
        Ok(())
    }
}
