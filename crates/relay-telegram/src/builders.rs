//! C7 — Builder Layer (§4.7). Pure, total, never-panicking conversions
//! from `teloxide::types` wire shapes into this workspace's store types.
//! Unknown/unsupported media is mapped to `Some("unknown".to_string())`
//! rather than dropped or panicking — builders must handle every input
//! the SDK can hand them (§4.7 "never panics on unrecognized input").
//!
//! Grounded on `handlers.py`'s `_build_message`/`_build_chat` helpers,
//! carried field-for-field, and on `handler.rs`'s
//! `msg.photo()/.document()/...` media probing style for the
//! media-kind match.

use relay_core::types::{ChatId, MessageId, UserId};
use relay_store::types::{Chat, ChatKind, Message, Reaction, User, UserStatus};
use teloxide::types::{
    Chat as TgChat, ChatKind as TgChatKind, Message as TgMessage, MessageKind as TgMessageKind,
    User as TgUser,
};

pub fn build_user(user: &TgUser) -> User {
    User {
        id: UserId::from(user.id.0 as i64),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        phone: None,
        is_bot: user.is_bot,
        is_self: false,
        status: UserStatus::Unknown,
        updated_at: chrono::Utc::now(),
    }
}

pub fn build_chat(chat: &TgChat) -> Chat {
    let kind = match &chat.kind {
        TgChatKind::Private(_) => ChatKind::Dm,
        TgChatKind::Public(public) => match public.kind {
            teloxide::types::PublicChatKind::Group(_) => ChatKind::Group,
            teloxide::types::PublicChatKind::Supergroup(_) => ChatKind::Supergroup,
            teloxide::types::PublicChatKind::Channel(_) => ChatKind::Channel,
        },
    };
    Chat {
        id: ChatId::from(chat.id.0),
        kind,
        title: chat_title(chat),
        unread_count: 0,
        participants_count: None,
        is_pinned: false,
        is_muted: false,
        is_archived: false,
        draft: None,
        last_message_id: None,
        last_message_date: None,
        sort_order: 0,
        updated_at: chrono::Utc::now(),
    }
}

fn chat_title(chat: &TgChat) -> String {
    if let Some(title) = chat.title() {
        return title.to_string();
    }
    if let Some(username) = chat.username() {
        return format!("@{username}");
    }
    if let (Some(first), last) = (chat.first_name(), chat.last_name()) {
        return match last {
            Some(last) => format!("{first} {last}"),
            None => first.to_string(),
        };
    }
    chat.id.0.to_string()
}

/// Total media-kind classifier. Returns `None` for plain text, `Some(kind)`
/// for every recognized attachment kind, and `Some("unknown")` for any
/// message kind this builder has not been taught — never panics.
fn media_kind(msg: &TgMessage) -> Option<String> {
    match &msg.kind {
        TgMessageKind::Common(common) => match &common.media_kind {
            teloxide::types::MediaKind::Text(_) => None,
            teloxide::types::MediaKind::Photo(_) => Some("photo".to_string()),
            teloxide::types::MediaKind::Document(_) => Some("document".to_string()),
            teloxide::types::MediaKind::Video(_) => Some("video".to_string()),
            teloxide::types::MediaKind::Audio(_) => Some("audio".to_string()),
            teloxide::types::MediaKind::Voice(_) => Some("voice".to_string()),
            teloxide::types::MediaKind::Sticker(_) => Some("sticker".to_string()),
            teloxide::types::MediaKind::Animation(_) => Some("animation".to_string()),
            teloxide::types::MediaKind::VideoNote(_) => Some("video_note".to_string()),
            teloxide::types::MediaKind::Contact(_) => Some("contact".to_string()),
            teloxide::types::MediaKind::Location(_) => Some("location".to_string()),
            teloxide::types::MediaKind::Poll(_) => Some("poll".to_string()),
            teloxide::types::MediaKind::Venue(_) => Some("venue".to_string()),
            _ => Some("unknown".to_string()),
        },
        _ => Some("unknown".to_string()),
    }
}

fn message_text(msg: &TgMessage) -> String {
    msg.text().or_else(|| msg.caption()).unwrap_or("").to_string()
}

pub fn build_message(msg: &TgMessage) -> Message {
    Message {
        id: MessageId::from(msg.id.0 as u64),
        chat_id: ChatId::from(msg.chat.id.0),
        from_id: msg.from().map(|u| UserId::from(u.id.0 as i64)),
        date: msg.date,
        text: message_text(msg),
        is_outgoing: msg.from().map(|u| u.is_bot).unwrap_or(false),
        is_edited: msg.edit_date().is_some(),
        reply_to_id: msg
            .reply_to_message()
            .map(|m| MessageId::from(m.id.0 as u64)),
        media_kind: media_kind(msg),
        reactions: Vec::<Reaction>::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::{ChatId as TgChatId, MessageId as TgMessageId, UserId as TgUserId};

    fn sample_tg_user() -> TgUser {
        TgUser {
            id: TgUserId(7),
            is_bot: false,
            first_name: "Alice".to_string(),
            last_name: None,
            username: Some("alice".to_string()),
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    #[test]
    fn build_user_maps_identity_fields() {
        let user = build_user(&sample_tg_user());
        assert_eq!(user.id, UserId::from(7i64));
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert!(!user.is_bot);
    }
}
