//! Dev harness binary: drives one `LifecycleController<TelegramClient>`
//! from newline-delimited JSON on stdin/stdout (§6). Stands in for the
//! real host process, which is this workspace's declared non-goal — every line this process
//! reads is a `ReqFrame`, every line it writes is a `ResFrame` or an
//! unsolicited `EventFrame`.
//!
//! Grounded on `skynet-gateway::main`'s shape (tracing init, then hand
//! off to the long-lived loop) and on `server.py::run_server`'s stdio
//! transport loop.

mod bridge;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use relay_core::config::{RateLimitConfig, RATE_LIMIT_RETRY_CAP};
use relay_core::error::SkillError;
use relay_protocol::frames::{InboundFrame, ResFrame};
use relay_protocol::lifecycle::{LoadParams, Trigger};
use relay_protocol::methods;
use relay_runtime::LifecycleController;
use relay_telegram::{tools::build_registry, BotTokenStep, TelegramClient};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

use bridge::{StdioHost, StdoutWriter};

#[derive(Parser, Debug)]
#[command(name = "relay-runner", about = "Stdio dev harness for the Telegram skill session runtime")]
struct Args {
    /// Override the default `RUST_LOG`-style filter (e.g. "relay_runner=debug,relay_runtime=trace").
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            args.log_filter
                .map(tracing_subscriber::EnvFilter::new)
                .or_else(|| tracing_subscriber::EnvFilter::try_from_default_env().ok())
                .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("relay_runner=info,relay_runtime=info")),
        )
        .init();

    let writer = StdoutWriter::new();
    let host = Arc::new(StdioHost::new(writer));

    let controller = Arc::new(LifecycleController::<TelegramClient>::new(
        host.clone() as Arc<dyn relay_host::Host>,
        relay_core::config::DEFAULT_MESSAGE_BUFFER_SIZE,
        RateLimitConfig::default(),
        RATE_LIMIT_RETRY_CAP,
        relay_core::config::DEFAULT_RETENTION_DAYS,
        vec![Box::new(BotTokenStep)],
        Box::new(|creds: &Value| {
            let token = creds
                .get("bot_token")
                .and_then(|v| v.as_str())
                .ok_or_else(|| SkillError::Auth("missing bot_token".to_string()))?;
            Ok(Arc::new(TelegramClient::new(token)))
        }),
        Box::new(build_registry),
    ));

    warn!("relay-runner: reading newline-delimited req frames from stdin");
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = dispatch_line(&controller, &host, &line).await;
        if let Ok(text) = serde_json::to_string(&response) {
            println!("{text}");
        }
    }

    Ok(())
}

async fn dispatch_line(
    controller: &Arc<LifecycleController<TelegramClient>>,
    host: &Arc<StdioHost>,
    line: &str,
) -> ResFrame {
    let inbound: InboundFrame = match serde_json::from_str(line) {
        Ok(frame) => frame,
        Err(e) => {
            error!(error = %e, "relay-runner: malformed frame, ignoring");
            return ResFrame::err("unknown", "PARSE_ERROR", &e.to_string());
        }
    };
    let Some(req) = inbound.as_req() else {
        return ResFrame::err("unknown", "PARSE_ERROR", "expected a req frame");
    };
    let id = req.id.clone();
    let params = req.params.unwrap_or(Value::Null);

    match req.method.as_str() {
        methods::LOAD => match serde_json::from_value::<LoadParams>(params) {
            Ok(load_params) => {
                host.set_data_dir(PathBuf::from(&load_params.data_dir)).await;
                ResFrame::ok(id, controller.load(load_params).await)
            }
            Err(e) => ResFrame::err(id, "VALIDATION", &e.to_string()),
        },
        methods::UNLOAD => {
            let disconnect = params.get("disconnect").and_then(|v| v.as_bool()).unwrap_or(false);
            controller.unload(disconnect).await;
            ResFrame::ok(id, serde_json::json!({}))
        }
        methods::TICK => {
            controller.tick().await;
            ResFrame::ok(id, serde_json::json!({}))
        }
        methods::STATUS => ResFrame::ok(id, controller.status().await),
        methods::SETUP_START => ResFrame::ok(id, controller.setup_start().await),
        methods::SETUP_SUBMIT => {
            let Some(step_id) = params.get("step_id").and_then(|v| v.as_str()).map(String::from) else {
                return ResFrame::err(id, "VALIDATION", "missing required field: step_id");
            };
            let values = params.get("values").cloned().unwrap_or(Value::Null);
            ResFrame::ok(id, controller.setup_submit(&step_id, values).await)
        }
        methods::SETUP_CANCEL => {
            controller.setup_cancel().await;
            ResFrame::ok(id, serde_json::json!({}))
        }
        methods::CALL_TOOL => {
            let Some(name) = params.get("name").and_then(|v| v.as_str()).map(String::from) else {
                return ResFrame::err(id, "VALIDATION", "missing required field: name");
            };
            let tool_args = params.get("args").cloned().unwrap_or(serde_json::json!({}));
            ResFrame::ok(id, controller.call_tool(&name, tool_args).await)
        }
        methods::TRIGGER_REGISTER => match serde_json::from_value::<Trigger>(params) {
            Ok(trigger) => {
                controller.trigger_register(trigger);
                ResFrame::ok(id, serde_json::json!({}))
            }
            Err(e) => ResFrame::err(id, "VALIDATION", &e.to_string()),
        },
        methods::TRIGGER_REMOVE => {
            let Some(trigger_id) = params.get("id").and_then(|v| v.as_str()) else {
                return ResFrame::err(id, "VALIDATION", "missing required field: id");
            };
            controller.trigger_remove(trigger_id);
            ResFrame::ok(id, serde_json::json!({}))
        }
        methods::DISCONNECT => {
            controller.unload(true).await;
            ResFrame::ok(id, serde_json::json!({}))
        }
        other => ResFrame::err(id, "UNKNOWN_METHOD", &format!("unknown method: {other}")),
    }
}
