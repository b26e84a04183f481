//! C8 — Event Ingest (§4.8). Long-polls Telegram's `getUpdates`, runs
//! each update through the builder layer (C7), and applies the result to
//! C2/C3/C5 in order: state store, durable store, entity emitter — per
//! §2's ingest data flow `external service → C6 → C7 → C8 → (C2, C3, C5)`.
//!
//! One failing update is logged and skipped rather than aborting the
//! loop, mirroring `original_source/skills/telegram/events/handlers.py`'s
//! per-handler try/except/continue shape.
//!
//! Cancellation is cooperative (§5): the in-flight `getUpdates` call (or
//! sleep) is raced against `cancel.cancelled()`, so a cancellation never
//! waits out a full long-poll window.
//!
//! Gap recovery (§4.8): the Bot API's offset cursor has no backfill
//! endpoint, so a non-successor update id is logged and the loop simply
//! continues from whatever the server just sent, rather than attempting
//! to reconstruct the missed range.

use std::sync::Arc;

use relay_host::EntityEmitter;
use relay_runtime::IngestDeps;
use relay_store::types::{EventKind, UpdateCursor};
use teloxide::payloads::GetUpdatesSetters;
use teloxide::requests::Requester;
use teloxide::types::{Message as TgMessage, UpdateKind};
use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::builders;
use crate::client::{LONG_POLL_TIMEOUT_SECS, POLL_RETRY_DELAY};

pub fn spawn(bot: Bot, deps: IngestDeps, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(bot, deps, cancel))
}

async fn run(bot: Bot, deps: IngestDeps, cancel: CancellationToken) {
    let deps = Arc::new(deps);
    let mut offset: i64 = deps
        .durable
        .get_update_cursor()
        .ok()
        .flatten()
        .map(|c| c.pts)
        .unwrap_or(0);

    loop {
        let poll = bot
            .get_updates()
            .offset(offset as i32)
            .timeout(LONG_POLL_TIMEOUT_SECS as u32)
            .send();

        let updates = tokio::select! {
            _ = cancel.cancelled() => return,
            result = poll => result,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    let update_id = update.id as i64;
                    if offset != 0 && update_id > offset {
                        warn!(
                            expected = offset,
                            got = update_id,
                            "ingest: gap in update cursor, re-synchronizing from the next live update"
                        );
                    }
                    offset = offset.max(update_id + 1);
                    apply_update(&deps, update.kind).await;
                }
                if let Err(e) = deps.durable.set_update_cursor(UpdateCursor {
                    pts: offset,
                    qts: 0,
                    date: 0,
                    seq: 0,
                }) {
                    warn!(error = %e, "ingest: failed to persist update cursor");
                }
            }
            Err(e) => {
                warn!(error = %e, "ingest: getUpdates failed, retrying after backoff");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
            }
        }
    }
}

async fn apply_update(deps: &IngestDeps, kind: UpdateKind) {
    match kind {
        UpdateKind::Message(msg) | UpdateKind::ChannelPost(msg) => {
            handle_message(deps, &msg, false).await;
        }
        UpdateKind::EditedMessage(msg) | UpdateKind::EditedChannelPost(msg) => {
            handle_message(deps, &msg, true).await;
        }
        UpdateKind::MyChatMember(update) | UpdateKind::ChatMember(update) => {
            handle_chat_member(deps, update).await;
        }
        _ => {}
    }
}

async fn handle_message(deps: &IngestDeps, msg: &TgMessage, edited: bool) {
    let chat = builders::build_chat(&msg.chat);
    let sender = msg.from().map(builders::build_user);

    if let Some(sender) = &sender {
        deps.store.add_users(vec![sender.clone()]);
        if let Err(e) = deps.durable.upsert_user(sender) {
            warn!(user_id = %sender.id, error = %e, "ingest: failed to persist user");
        }
    }

    deps.store.add_chats(vec![chat.clone()]);
    if let Err(e) = deps.durable.upsert_chat(&chat) {
        warn!(chat_id = %chat.id, error = %e, "ingest: failed to persist chat");
        return;
    }

    let message = builders::build_message(msg);
    let is_new = deps
        .store
        .add_messages(&chat.id, vec![message.clone()])
        .first()
        .copied()
        .unwrap_or(true);
    if let Err(e) = deps.durable.upsert_message(&message) {
        warn!(chat_id = %chat.id, error = %e, "ingest: failed to persist message");
        return;
    }

    let is_inbound = !message.is_outgoing;
    deps.store.update_chat(&chat.id, |c| {
        c.last_message_id = Some(message.id);
        c.last_message_date = Some(message.date);
        if !edited && is_inbound && is_new {
            c.unread_count += 1;
        }
    });

    let event_type = if edited {
        EventKind::MessageEdited
    } else {
        EventKind::NewMessage
    };
    let payload = serde_json::json!({
        "message_id": message.id.to_string(),
        "from_id": message.from_id.as_ref().map(|id| id.to_string()),
        "text": message.text,
    });
    if let Err(e) = deps.durable.insert_event(event_type, Some(&chat.id), &payload) {
        warn!(chat_id = %chat.id, error = %e, "ingest: failed to record event");
    }

    let emitter = EntityEmitter::new(deps.host.as_ref());
    emitter.emit_chat(&chat, sender.as_ref()).await;
    if let Some(sender) = &sender {
        emitter.emit_user(sender).await;
        emitter.emit_speaker_in(&chat, sender).await;
    }

    let event_name = if edited { "telegram.message_edited" } else { "telegram.message" };
    fire_matching_triggers(deps, event_name, Some(&chat.id), &payload).await;
    let _ = deps.host.push_event(event_name, payload).await;
}

/// §4.8 step 5: evaluate in-memory triggers and invoke `fire_trigger` for
/// each match. Best-effort — a failing RPC call is logged and the event
/// pipeline continues regardless (never blocks ingest).
async fn fire_matching_triggers(
    deps: &IngestDeps,
    event_type: &str,
    chat_id: Option<&relay_core::types::ChatId>,
    payload: &serde_json::Value,
) {
    for trigger_id in deps.triggers.evaluate(event_type, chat_id, payload) {
        if let Err(e) = deps.host.fire_trigger(&trigger_id, payload.clone()).await {
            warn!(trigger_id = %trigger_id, error = %e, "ingest: fire_trigger failed, continuing");
        }
    }
}

/// Bot-API member-status updates are the closest analogue this adapter
/// has to a MTProto `member_of` signal; translated to a `ChatAction`
/// event and a `member_of` relationship rather than `messages_read`,
/// which the Bot API never reports (see client.rs's module note).
async fn handle_chat_member(deps: &IngestDeps, update: teloxide::types::ChatMemberUpdated) {
    let chat = builders::build_chat(&update.chat);
    let member = builders::build_user(&update.new_chat_member.user);

    deps.store.add_chats(vec![chat.clone()]);
    if let Err(e) = deps.durable.upsert_chat(&chat) {
        warn!(chat_id = %chat.id, error = %e, "ingest: failed to persist chat");
        return;
    }
    deps.store.add_users(vec![member.clone()]);
    if let Err(e) = deps.durable.upsert_user(&member) {
        warn!(user_id = %member.id, error = %e, "ingest: failed to persist user");
    }

    let payload = serde_json::json!({
        "user_id": member.id.to_string(),
        "status": format!("{:?}", update.new_chat_member.kind),
    });
    if let Err(e) = deps.durable.insert_event(EventKind::ChatAction, Some(&chat.id), &payload) {
        warn!(chat_id = %chat.id, error = %e, "ingest: failed to record event");
    }

    let emitter = EntityEmitter::new(deps.host.as_ref());
    emitter.emit_chat(&chat, None).await;
    emitter.emit_user(&member).await;
    emitter.emit_member_of(&chat, &member).await;

    fire_matching_triggers(deps, "telegram.chat_action", Some(&chat.id), &payload).await;
}
