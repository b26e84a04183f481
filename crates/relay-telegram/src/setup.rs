//! C11 — single-step setup wizard for Telegram: collect a bot token and
//! validate it live against `getMe` before accepting it (§4.11's "a step
//! may perform live validation against the external service").
//!
//! Grounded on `relay_runtime::setup`'s generic engine plus
//! `original_source/dev/types/setup_types.py`'s field shapes;
//! there is exactly one step because the Bot API's only credential is
//! the bot token (no phone/code/2FA triad as MTProto would need).

use async_trait::async_trait;
use relay_protocol::setup::{SetupField, SetupFieldError, SetupFieldKind, SetupStep};
use relay_runtime::SetupStepHandler;
use serde_json::Value;
use teloxide::requests::Requester;
use teloxide::Bot;

pub const BOT_TOKEN_STEP_ID: &str = "bot_token";

pub struct BotTokenStep;

#[async_trait]
impl SetupStepHandler for BotTokenStep {
    fn id(&self) -> &str {
        BOT_TOKEN_STEP_ID
    }

    fn describe(&self, _transient: &Value) -> SetupStep {
        SetupStep {
            id: BOT_TOKEN_STEP_ID.to_string(),
            title: "Connect your Telegram bot".to_string(),
            description: Some(
                "Create a bot with @BotFather and paste the token it gives you.".to_string(),
            ),
            fields: vec![SetupField {
                name: "bot_token".to_string(),
                kind: SetupFieldKind::Password,
                label: "Bot token".to_string(),
                description: None,
                required: true,
                default: None,
                placeholder: Some("123456:ABC-DEF...".to_string()),
                options: None,
            }],
        }
    }

    async fn validate(&self, values: &Value, transient: &mut Value) -> Result<(), Vec<SetupFieldError>> {
        let token = values.get("bot_token").and_then(|v| v.as_str()).unwrap_or("").trim();
        if token.is_empty() {
            return Err(vec![SetupFieldError {
                field: "bot_token".to_string(),
                message: "required".to_string(),
            }]);
        }

        let bot = Bot::new(token);
        if let Err(e) = bot.get_me().send().await {
            return Err(vec![SetupFieldError {
                field: "bot_token".to_string(),
                message: format!("token rejected by Telegram: {e}"),
            }]);
        }

        transient["bot_token"] = Value::String(token.to_string());
        Ok(())
    }
}
