use thiserror::Error;

/// Errors raised by the outbound RPC surface (§6) — calls the skill
/// makes into the host process.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host RPC call failed: {0}")]
    CallFailed(String),

    #[error("host RPC timed out after {ms}ms")]
    Timeout { ms: u64 },
}
