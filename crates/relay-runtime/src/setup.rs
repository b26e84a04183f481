//! C11 — Setup Wizard Engine (§4.11). A forward-only step machine:
//! steps are tried in order, each may perform live validation against
//! the external service, and transient validation state (phone-code
//! hashes, OAuth codes) lives only in this engine's memory — discarded
//! on cancel or process restart, never persisted (§4.11 protocol rule).
//!
//! Grounded on
//! `original_source/skills/telegram/events` sibling
//! `dev/types/setup_types.py`'s frozen step/result shapes (carried into
//! `relay_protocol::setup` unchanged) and the kitchen-sink example's
//! `setup/steps.py` forward-only step list.

use std::sync::Arc;

use async_trait::async_trait;
use relay_host::Host;
use relay_protocol::setup::{SetupFieldError, SetupResult, SetupStep};
use serde_json::Value;
use tokio::sync::Mutex;

/// One step in the wizard. `step()` may read the transient context
/// accumulated from earlier steps to decide what to ask next — the
/// spec's "the next step can depend on prior answers" (§4.11).
#[async_trait]
pub trait SetupStepHandler: Send + Sync {
    fn id(&self) -> &str;

    /// Build the `SetupStep` description to send the host, given
    /// whatever transient state earlier steps have accumulated.
    fn describe(&self, transient: &Value) -> SetupStep;

    /// Perform live validation (may call the external service) and, on
    /// success, fold `values` into `transient` for later steps/on
    /// completion to read. Returns field-level errors on failure.
    async fn validate(&self, values: &Value, transient: &mut Value) -> Result<(), Vec<SetupFieldError>>;
}

/// What happens once every step has validated successfully: persist
/// the accumulated transient state as the skill's credentials.
#[async_trait]
pub trait SetupCompletion: Send + Sync {
    async fn complete(&self, transient: &Value) -> Result<String, String>;
}

struct EngineState {
    current_step: usize,
    transient: Value,
}

/// Stateless across process restarts by design (§4.11): `EngineState`
/// lives only in this struct's memory, never written to C3 or the host.
pub struct SetupWizardEngine {
    steps: Vec<Box<dyn SetupStepHandler>>,
    completion: Arc<dyn SetupCompletion>,
    state: Mutex<Option<EngineState>>,
}

impl SetupWizardEngine {
    pub fn new(steps: Vec<Box<dyn SetupStepHandler>>, completion: Arc<dyn SetupCompletion>) -> Self {
        Self {
            steps,
            completion,
            state: Mutex::new(None),
        }
    }

    /// `setup_start()` — (re)initializes transient state and returns the
    /// first step, or `complete` immediately if there are no steps.
    pub async fn start(&self) -> SetupResult {
        let mut state = self.state.lock().await;
        *state = Some(EngineState {
            current_step: 0,
            transient: Value::Object(Default::default()),
        });
        match self.steps.first() {
            Some(step) => SetupResult::next(step.describe(&state.as_ref().unwrap().transient)),
            None => SetupResult::complete("no setup required"),
        }
    }

    /// `setup_submit(step_id, values)`. Only the current step may be
    /// submitted — a stale `step_id` (e.g. after a restart reset the
    /// engine) is rejected as a validation error rather than silently
    /// accepted, since the engine is forward-only.
    pub async fn submit(&self, step_id: &str, values: Value) -> SetupResult {
        let mut guard = self.state.lock().await;
        let Some(state) = guard.as_mut() else {
            return SetupResult::error(vec![SetupFieldError {
                field: "_step".to_string(),
                message: "setup was not started".to_string(),
            }]);
        };

        let Some(handler) = self.steps.get(state.current_step) else {
            return SetupResult::error(vec![SetupFieldError {
                field: "_step".to_string(),
                message: "no active step".to_string(),
            }]);
        };

        if handler.id() != step_id {
            return SetupResult::error(vec![SetupFieldError {
                field: "_step".to_string(),
                message: format!("expected step '{}', got '{step_id}'", handler.id()),
            }]);
        }

        if let Err(errors) = handler.validate(&values, &mut state.transient).await {
            return SetupResult::error(errors);
        }

        state.current_step += 1;
        match self.steps.get(state.current_step) {
            Some(next) => SetupResult::next(next.describe(&state.transient)),
            None => {
                let transient = state.transient.clone();
                match self.completion.complete(&transient).await {
                    Ok(message) => {
                        *guard = None;
                        SetupResult::complete(message)
                    }
                    Err(message) => SetupResult::error(vec![SetupFieldError {
                        field: "_complete".to_string(),
                        message,
                    }]),
                }
            }
        }
    }

    /// `setup_cancel()` — discards transient state per §4.11.
    pub async fn cancel(&self) {
        *self.state.lock().await = None;
    }
}

/// Writes the completed setup's credentials to `config.json` via the
/// `Host::write_data` RPC (§6 persisted state layout).
pub struct WriteConfigCompletion {
    pub host: Arc<dyn Host>,
}

#[async_trait]
impl SetupCompletion for WriteConfigCompletion {
    async fn complete(&self, transient: &Value) -> Result<String, String> {
        let bytes = serde_json::to_vec(transient).map_err(|e| e.to_string())?;
        self.host
            .write_data("config.json", &bytes)
            .await
            .map_err(|e| e.to_string())?;
        Ok("connected".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_protocol::setup::{SetupField, SetupFieldKind, SetupStatus};

    struct StubCompletion;
    #[async_trait]
    impl SetupCompletion for StubCompletion {
        async fn complete(&self, _transient: &Value) -> Result<String, String> {
            Ok("done".to_string())
        }
    }

    struct TokenStep;
    #[async_trait]
    impl SetupStepHandler for TokenStep {
        fn id(&self) -> &str {
            "bot_token"
        }
        fn describe(&self, _transient: &Value) -> SetupStep {
            SetupStep {
                id: "bot_token".to_string(),
                title: "Connect your bot".to_string(),
                description: None,
                fields: vec![SetupField {
                    name: "bot_token".to_string(),
                    kind: SetupFieldKind::Password,
                    label: "Bot token".to_string(),
                    description: None,
                    required: true,
                    default: None,
                    placeholder: None,
                    options: None,
                }],
            }
        }
        async fn validate(&self, values: &Value, transient: &mut Value) -> Result<(), Vec<SetupFieldError>> {
            let token = values.get("bot_token").and_then(|v| v.as_str()).unwrap_or("");
            if token.is_empty() {
                return Err(vec![SetupFieldError {
                    field: "bot_token".to_string(),
                    message: "required".to_string(),
                }]);
            }
            transient["bot_token"] = Value::String(token.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_step_flow_completes() {
        let engine = SetupWizardEngine::new(vec![Box::new(TokenStep)], Arc::new(StubCompletion));
        let first = engine.start().await;
        assert_eq!(first.status, SetupStatus::Next);

        let result = engine
            .submit("bot_token", serde_json::json!({"bot_token": "123:abc"}))
            .await;
        assert_eq!(result.status, SetupStatus::Complete);
    }

    #[tokio::test]
    async fn invalid_value_reoffers_same_step() {
        let engine = SetupWizardEngine::new(vec![Box::new(TokenStep)], Arc::new(StubCompletion));
        engine.start().await;
        let result = engine.submit("bot_token", serde_json::json!({"bot_token": ""})).await;
        assert_eq!(result.status, SetupStatus::Error);
    }

    #[tokio::test]
    async fn submit_without_start_is_rejected() {
        let engine = SetupWizardEngine::new(vec![Box::new(TokenStep)], Arc::new(StubCompletion));
        let result = engine.submit("bot_token", serde_json::json!({})).await;
        assert_eq!(result.status, SetupStatus::Error);
    }

    #[tokio::test]
    async fn cancel_discards_transient_state() {
        let engine = SetupWizardEngine::new(vec![Box::new(TokenStep)], Arc::new(StubCompletion));
        engine.start().await;
        engine.cancel().await;
        let result = engine.submit("bot_token", serde_json::json!({"bot_token": "x"})).await;
        assert_eq!(result.status, SetupStatus::Error);
    }
}
