//! In-memory trigger registry, evaluated by C8 on every ingested event
//! (§4.8 step 5: "evaluate in-memory triggers; invoke `fire_trigger` RPC
//! for each match. Trigger evaluation is best-effort — an exception in
//! one trigger must not block the event pipeline"). Per §3's `Trigger`
//! entity note, triggers are "stored only in memory" — never durable,
//! never surviving an `unload`/reload cycle; the host is expected to
//! re-register them on every `load` via `trigger_register`.
//!
//! Grounded on `relay-store::memory::StateStore`'s subscriber-list shape
//! (a `Mutex<Vec<_>>` mutated by register/remove, walked synchronously
//! on every relevant mutation) generalized from "state-change listener"
//! to "event predicate with a remote id to fire".

use std::sync::Mutex;

use relay_core::types::ChatId;
use relay_protocol::lifecycle::Trigger;
use serde_json::Value;

/// A trigger matches an event when every key present in its `predicate`
/// object is also present in the event's match context with an equal
/// value. An empty predicate matches every event of any `event_type`
/// present in `config["event_type"]` (or every event at all if that key
/// is also absent) — deliberately permissive, since the host is the
/// only party that ever constructs a predicate.
fn matches(trigger: &Trigger, event_type: &str, chat_id: Option<&ChatId>, payload: &Value) -> bool {
    if let Some(want_type) = trigger.config.get("event_type").and_then(|v| v.as_str()) {
        if want_type != event_type {
            return false;
        }
    }
    let Some(predicate) = trigger.predicate.as_object() else {
        return true;
    };
    predicate.iter().all(|(key, want)| {
        if key == "chat_id" {
            return chat_id.map(|c| c.as_str()) == want.as_str();
        }
        payload.get(key) == Some(want)
    })
}

/// Single-process, in-memory-only trigger store (§3, §4.8, §6
/// `trigger_register`/`trigger_remove`). Registered triggers are
/// evaluated against every event C8 ingests; matches are reported to
/// the host via `Host::fire_trigger` by the caller (`relay-telegram::ingest`),
/// which owns the event payload shape this registry only pattern-matches.
pub struct TriggerRegistry {
    triggers: Mutex<Vec<Trigger>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self {
            triggers: Mutex::new(Vec::new()),
        }
    }

    /// Re-registering an id already present replaces the prior
    /// definition rather than duplicating it — the host is expected to
    /// re-send its full trigger set on reconnect, not accumulate stale
    /// copies.
    pub fn register(&self, trigger: Trigger) {
        let mut triggers = self.triggers.lock().expect("trigger registry mutex poisoned");
        triggers.retain(|t| t.id != trigger.id);
        triggers.push(trigger);
    }

    pub fn remove(&self, trigger_id: &str) {
        let mut triggers = self.triggers.lock().expect("trigger registry mutex poisoned");
        triggers.retain(|t| t.id != trigger_id);
    }

    /// Returns the ids of every trigger matching this event, each paired
    /// with the payload to hand `fire_trigger` (the event's own payload,
    /// not the trigger's config — the host correlates by trigger id).
    pub fn evaluate(&self, event_type: &str, chat_id: Option<&ChatId>, payload: &Value) -> Vec<String> {
        let triggers = self.triggers.lock().expect("trigger registry mutex poisoned");
        triggers
            .iter()
            .filter(|t| matches(t, event_type, chat_id, payload))
            .map(|t| t.id.clone())
            .collect()
    }
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(id: &str, event_type: &str, predicate: Value) -> Trigger {
        Trigger {
            id: id.to_string(),
            trigger_type: "keyword".to_string(),
            config: serde_json::json!({ "event_type": event_type }),
            predicate,
        }
    }

    #[test]
    fn matching_trigger_is_returned() {
        let registry = TriggerRegistry::new();
        registry.register(trigger("t1", "telegram.message", serde_json::json!({})));
        let matches = registry.evaluate(
            "telegram.message",
            Some(&ChatId::from("1")),
            &serde_json::json!({"text": "hi"}),
        );
        assert_eq!(matches, vec!["t1".to_string()]);
    }

    #[test]
    fn event_type_mismatch_does_not_match() {
        let registry = TriggerRegistry::new();
        registry.register(trigger("t1", "telegram.message_edited", serde_json::json!({})));
        let matches = registry.evaluate("telegram.message", None, &serde_json::json!({}));
        assert!(matches.is_empty());
    }

    #[test]
    fn predicate_key_must_match_payload_value() {
        let registry = TriggerRegistry::new();
        registry.register(trigger(
            "t1",
            "telegram.message",
            serde_json::json!({"from_id": "7"}),
        ));
        let miss = registry.evaluate(
            "telegram.message",
            None,
            &serde_json::json!({"from_id": "8"}),
        );
        assert!(miss.is_empty());
        let hit = registry.evaluate(
            "telegram.message",
            None,
            &serde_json::json!({"from_id": "7"}),
        );
        assert_eq!(hit, vec!["t1".to_string()]);
    }

    #[test]
    fn chat_id_predicate_matches_against_event_chat() {
        let registry = TriggerRegistry::new();
        registry.register(trigger(
            "t1",
            "telegram.message",
            serde_json::json!({"chat_id": "42"}),
        ));
        let hit = registry.evaluate("telegram.message", Some(&ChatId::from("42")), &serde_json::json!({}));
        assert_eq!(hit, vec!["t1".to_string()]);
        let miss = registry.evaluate("telegram.message", Some(&ChatId::from("99")), &serde_json::json!({}));
        assert!(miss.is_empty());
    }

    #[test]
    fn re_registering_same_id_replaces_definition() {
        let registry = TriggerRegistry::new();
        registry.register(trigger("t1", "telegram.message", serde_json::json!({"from_id": "1"})));
        registry.register(trigger("t1", "telegram.message", serde_json::json!({"from_id": "2"})));
        let miss = registry.evaluate("telegram.message", None, &serde_json::json!({"from_id": "1"}));
        assert!(miss.is_empty());
        let hit = registry.evaluate("telegram.message", None, &serde_json::json!({"from_id": "2"}));
        assert_eq!(hit, vec!["t1".to_string()]);
    }

    #[test]
    fn removed_trigger_no_longer_matches() {
        let registry = TriggerRegistry::new();
        registry.register(trigger("t1", "telegram.message", serde_json::json!({})));
        registry.remove("t1");
        let matches = registry.evaluate("telegram.message", None, &serde_json::json!({}));
        assert!(matches.is_empty());
    }
}
