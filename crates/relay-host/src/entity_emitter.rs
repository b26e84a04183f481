//! C5 — Entity Emitter. Converts internal entities into the host
//! knowledge graph's vocabulary (§4.5). Emission is idempotent: the host
//! merges on `(source, source_id)`, so repeated emission of an unchanged
//! chat/user/summary is harmless — callers do not need their own
//! deduplication.
//!
//! Invoked from: lifecycle load (initial bulk emit), ingest (per
//! affected chat/user), tick (summary emit). A failure here is logged
//! and does not abort the caller's pipeline — the next emission attempt
//! (next event, next tick) will retry the same idempotent upsert.

use relay_protocol::entity::{namespaced_id, Entity, Relationship};
use relay_store::types::{Chat, ChatKind, Summary, User};
use tracing::warn;

use crate::host::Host;

const SOURCE: &str = "telegram";

pub struct EntityEmitter<'h> {
    host: &'h dyn Host,
}

impl<'h> EntityEmitter<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self { host }
    }

    fn chat_entity_type(kind: ChatKind) -> &'static str {
        match kind {
            ChatKind::Dm => "telegram.dm",
            ChatKind::Group => "telegram.group",
            ChatKind::Supergroup => "telegram.group",
            ChatKind::Channel => "telegram.channel",
        }
    }

    /// Emit a chat entity and, for DMs, a `dm_with` relationship to the
    /// other party; for groups/channels a `member_of` relationship per
    /// known participant is left to the caller (ingest only has the
    /// chat, not its roster, at event time).
    pub async fn emit_chat(&self, chat: &Chat, dm_counterpart: Option<&User>) {
        let entity = Entity {
            entity_type: Self::chat_entity_type(chat.kind).to_string(),
            source: SOURCE.to_string(),
            source_id: namespaced_id(SOURCE, chat.id.as_str()),
            title: chat.title.clone(),
            metadata: serde_json::json!({
                "unread_count": chat.unread_count,
                "is_archived": chat.is_archived,
            }),
        };
        if let Err(e) = self.host.upsert_entity(entity).await {
            warn!(chat_id = %chat.id, error = %e, "entity emitter: upsert_entity(chat) failed");
            return;
        }

        if chat.kind == ChatKind::Dm {
            if let Some(user) = dm_counterpart {
                let relationship = Relationship {
                    source_id: namespaced_id(SOURCE, chat.id.as_str()),
                    target_id: namespaced_id(SOURCE, user.id.as_str()),
                    relationship_type: "dm_with".to_string(),
                    source: SOURCE.to_string(),
                    metadata: serde_json::json!({}),
                };
                if let Err(e) = self.host.upsert_relationship(relationship).await {
                    warn!(chat_id = %chat.id, error = %e, "entity emitter: upsert_relationship(dm_with) failed");
                }
            }
        }
    }

    pub async fn emit_member_of(&self, chat: &Chat, member: &User) {
        let relationship = Relationship {
            source_id: namespaced_id(SOURCE, member.id.as_str()),
            target_id: namespaced_id(SOURCE, chat.id.as_str()),
            relationship_type: "member_of".to_string(),
            source: SOURCE.to_string(),
            metadata: serde_json::json!({}),
        };
        if let Err(e) = self.host.upsert_relationship(relationship).await {
            warn!(chat_id = %chat.id, user_id = %member.id, error = %e, "entity emitter: upsert_relationship(member_of) failed");
        }
    }

    pub async fn emit_user(&self, user: &User) {
        let title = user
            .username
            .clone()
            .or_else(|| user.first_name.clone())
            .unwrap_or_else(|| user.id.to_string());
        let entity = Entity {
            entity_type: "telegram.contact".to_string(),
            source: SOURCE.to_string(),
            source_id: namespaced_id(SOURCE, user.id.as_str()),
            title,
            metadata: serde_json::json!({"is_bot": user.is_bot}),
        };
        if let Err(e) = self.host.upsert_entity(entity).await {
            warn!(user_id = %user.id, error = %e, "entity emitter: upsert_entity(user) failed");
        }
    }

    /// Emit a summary entity plus a `summarizes` relationship to every
    /// chat the summary covers.
    pub async fn emit_summary(&self, summary: &Summary, covered_chat_ids: &[relay_core::types::ChatId]) {
        let summary_source_id = namespaced_id(SOURCE, &summary.id.to_string());
        let entity = Entity {
            entity_type: "telegram.summary".to_string(),
            source: SOURCE.to_string(),
            source_id: summary_source_id.clone(),
            title: format!("{} summary {}", summary.summary_type, summary.period_start),
            metadata: serde_json::json!({"summary_type": summary.summary_type}),
        };
        if let Err(e) = self.host.upsert_entity(entity).await {
            warn!(summary_id = summary.id, error = %e, "entity emitter: upsert_entity(summary) failed");
            return;
        }

        for chat_id in covered_chat_ids {
            let relationship = Relationship {
                source_id: summary_source_id.clone(),
                target_id: namespaced_id(SOURCE, chat_id.as_str()),
                relationship_type: "summarizes".to_string(),
                source: SOURCE.to_string(),
                metadata: serde_json::json!({}),
            };
            if let Err(e) = self.host.upsert_relationship(relationship).await {
                warn!(summary_id = summary.id, chat_id = %chat_id, error = %e, "entity emitter: upsert_relationship(summarizes) failed");
            }
        }
    }

    /// `speaker_in` — emitted per distinct sender observed in a chat
    /// during ingest, linking the user to the chat they spoke in.
    pub async fn emit_speaker_in(&self, chat: &Chat, speaker: &User) {
        let relationship = Relationship {
            source_id: namespaced_id(SOURCE, speaker.id.as_str()),
            target_id: namespaced_id(SOURCE, chat.id.as_str()),
            relationship_type: "speaker_in".to_string(),
            source: SOURCE.to_string(),
            metadata: serde_json::json!({}),
        };
        if let Err(e) = self.host.upsert_relationship(relationship).await {
            warn!(chat_id = %chat.id, user_id = %speaker.id, error = %e, "entity emitter: upsert_relationship(speaker_in) failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::types::{ChatId, UserId};
    use relay_protocol::entity::{Entity, Relationship};
    use relay_store::types::UserStatus;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingHost {
        entities: Mutex<Vec<Entity>>,
        relationships: Mutex<Vec<Relationship>>,
    }

    #[async_trait]
    impl Host for RecordingHost {
        async fn set_state(&self, _partial: serde_json::Value) -> Result<(), crate::error::HostError> {
            Ok(())
        }
        async fn read_data(&self, _path: &str) -> Result<Option<Vec<u8>>, crate::error::HostError> {
            Ok(None)
        }
        async fn write_data(&self, _path: &str, _bytes: &[u8]) -> Result<(), crate::error::HostError> {
            Ok(())
        }
        async fn upsert_entity(&self, entity: Entity) -> Result<(), crate::error::HostError> {
            self.entities.lock().unwrap().push(entity);
            Ok(())
        }
        async fn upsert_relationship(&self, r: Relationship) -> Result<(), crate::error::HostError> {
            self.relationships.lock().unwrap().push(r);
            Ok(())
        }
        async fn fire_trigger(&self, _id: &str, _payload: serde_json::Value) -> Result<(), crate::error::HostError> {
            Ok(())
        }
        async fn push_event(&self, _t: &str, _payload: serde_json::Value) -> Result<(), crate::error::HostError> {
            Ok(())
        }
    }

    fn sample_dm(id: &str) -> Chat {
        Chat {
            id: ChatId::from(id),
            kind: ChatKind::Dm,
            title: "Alice".to_string(),
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

    fn sample_user(id: &str) -> User {
        User {
            id: UserId::from(id),
            first_name: Some("Alice".to_string()),
            last_name: None,
            username: None,
            phone: None,
            is_bot: false,
            is_self: false,
            status: UserStatus::Unknown,
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn dm_chat_emits_entity_and_dm_with_relationship() {
        let host = Arc::new(RecordingHost::default());
        let emitter = EntityEmitter::new(host.as_ref());
        let chat = sample_dm("100");
        let user = sample_user("7");

        emitter.emit_chat(&chat, Some(&user)).await;

        let entities = host.entities.lock().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, "telegram.dm");
        assert_eq!(entities[0].source_id, "telegram:100");

        let relationships = host.relationships.lock().unwrap();
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].relationship_type, "dm_with");
        assert_eq!(relationships[0].target_id, "telegram:7");
    }

    #[tokio::test]
    async fn group_chat_without_counterpart_emits_no_relationship() {
        let host = Arc::new(RecordingHost::default());
        let emitter = EntityEmitter::new(host.as_ref());
        let mut chat = sample_dm("200");
        chat.kind = ChatKind::Group;

        emitter.emit_chat(&chat, None).await;

        assert_eq!(host.entities.lock().unwrap().len(), 1);
        assert!(host.relationships.lock().unwrap().is_empty());
    }
}
