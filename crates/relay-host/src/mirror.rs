//! C4 — Host Mirror. Subscribes to C2 (`relay_store::StateStore`); on any
//! change it starts a 100 ms debounce timer. When the timer fires (no
//! further change arrived during the window) it builds the projection
//! snapshot and calls `Host::set_state`. Consecutive changes within the
//! window coalesce into a single push of the final snapshot (§4.4).

use std::sync::Arc;
use std::time::Duration;

use relay_store::{ConnectionStatus, StateStore};
use tokio::sync::watch;
use tracing::warn;

use crate::host::Host;

const DEBOUNCE: Duration = Duration::from_millis(100);

pub struct HostMirror {
    _task: tokio::task::JoinHandle<()>,
}

impl HostMirror {
    /// Subscribe to `store` and spawn the debounce/push task. The
    /// returned `HostMirror` must be kept alive for the mirror to keep
    /// running — dropping it aborts the task.
    pub fn spawn(store: Arc<StateStore>, host: Arc<dyn Host>) -> Self {
        let (tx, rx) = watch::channel(());
        store.subscribe(Box::new(move |_change| {
            // A listener must not mutate the store; sending on a watch
            // channel is the only side effect here (§4.2).
            let _ = tx.send(());
        }));

        let task = tokio::spawn(debounce_loop(rx, store, host));
        Self { _task: task }
    }
}

async fn debounce_loop(mut rx: watch::Receiver<()>, store: Arc<StateStore>, host: Arc<dyn Host>) {
    loop {
        if rx.changed().await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(DEBOUNCE) => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let snapshot = store.get_state();
        let partial = build_partial(&snapshot);
        if let Err(e) = host.set_state(partial).await {
            warn!(error = %e, "host mirror: set_state push failed");
        }
    }
}

fn build_partial(snapshot: &relay_store::StateSnapshot) -> serde_json::Value {
    serde_json::json!({
        "connection_status": connection_status_str(snapshot.connection_status),
        "is_authenticated": snapshot.is_authenticated,
        "current_user": snapshot.current_user,
        "chat_count": snapshot.chat_count,
        "is_initialized": snapshot.is_initialized,
        "is_syncing": snapshot.is_syncing,
        "initial_sync_complete": snapshot.initial_sync_complete,
        "last_sync": snapshot.last_sync,
    })
}

fn connection_status_str(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Disconnected => "disconnected",
        ConnectionStatus::Connecting => "connecting",
        ConnectionStatus::Connected => "connected",
        ConnectionStatus::Reconnecting => "reconnecting",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_protocol::entity::{Entity, Relationship};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHost {
        pushes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Host for CountingHost {
        async fn set_state(&self, _partial: serde_json::Value) -> Result<(), crate::error::HostError> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn read_data(&self, _path: &str) -> Result<Option<Vec<u8>>, crate::error::HostError> {
            Ok(None)
        }
        async fn write_data(&self, _path: &str, _bytes: &[u8]) -> Result<(), crate::error::HostError> {
            Ok(())
        }
        async fn upsert_entity(&self, _entity: Entity) -> Result<(), crate::error::HostError> {
            Ok(())
        }
        async fn upsert_relationship(&self, _r: Relationship) -> Result<(), crate::error::HostError> {
            Ok(())
        }
        async fn fire_trigger(&self, _id: &str, _payload: serde_json::Value) -> Result<(), crate::error::HostError> {
            Ok(())
        }
        async fn push_event(&self, _t: &str, _payload: serde_json::Value) -> Result<(), crate::error::HostError> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rapid_changes_coalesce_into_one_push() {
        let store = Arc::new(StateStore::new(200));
        let pushes = Arc::new(AtomicUsize::new(0));
        let host = Arc::new(CountingHost {
            pushes: pushes.clone(),
        });
        let _mirror = HostMirror::spawn(store.clone(), host);

        for _ in 0..5 {
            store.set_connection_status(ConnectionStatus::Connecting);
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(pushes.load(Ordering::SeqCst), 1);
    }
}
