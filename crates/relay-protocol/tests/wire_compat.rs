// Verify the Host↔Skill RPC wire format matches §6 exactly.
// These tests ensure the frame shapes stay stable across refactors.

use relay_protocol::entity::{namespaced_id, Entity, Relationship};
use relay_protocol::frames::{EventFrame, InboundFrame, ResFrame};
use relay_protocol::setup::{SetupField, SetupFieldKind, SetupResult, SetupStatus, SetupStep};
use relay_protocol::tool::ToolResult;

#[test]
fn req_frame_round_trip() {
    let json = r#"{"type":"req","id":"abc-123","method":"call_tool","params":{"name":"get_chats"}}"#;
    let frame: InboundFrame = serde_json::from_str(json).unwrap();
    assert_eq!(frame.frame_type, "req");

    let req = frame.as_req().unwrap();
    assert_eq!(req.method, "call_tool");
    assert_eq!(req.id, "abc-123");
}

#[test]
fn res_ok_serialization() {
    let res = ResFrame::ok("req-1", serde_json::json!({"pong": true}));
    let json = serde_json::to_string(&res).unwrap();

    assert!(json.contains(r#""type":"res""#));
    assert!(json.contains(r#""ok":true"#));
    assert!(json.contains(r#""pong":true"#));
    assert!(!json.contains(r#""error""#));
}

#[test]
fn res_err_serialization() {
    let res = ResFrame::err("req-2", "AUTH_ERROR", "bot token rejected");
    let json = serde_json::to_string(&res).unwrap();

    assert!(json.contains(r#""ok":false"#));
    assert!(json.contains(r#""AUTH_ERROR""#));
    assert!(!json.contains(r#""payload""#));
}

#[test]
fn event_frame_push_event() {
    let ev = EventFrame::new("push_event", serde_json::json!({"kind": "new_message"}));
    let json = serde_json::to_string(&ev).unwrap();

    assert!(json.contains(r#""type":"event""#));
    assert!(json.contains(r#""event":"push_event""#));
}

#[test]
fn inbound_frame_rejects_non_req() {
    let json = r#"{"type":"event","event":"push_event","payload":{}}"#;
    let frame: InboundFrame = serde_json::from_str(json).unwrap();
    assert!(frame.as_req().is_none(), "event frame must not parse as req");
}

#[test]
fn setup_step_with_field_round_trips() {
    let step = SetupStep {
        id: "bot_token".to_string(),
        title: "Connect your bot".to_string(),
        description: None,
        fields: vec![SetupField {
            name: "bot_token".to_string(),
            kind: SetupFieldKind::Password,
            label: "Bot token".to_string(),
            description: Some("From @BotFather".to_string()),
            required: true,
            default: None,
            placeholder: None,
            options: None,
        }],
    };
    let result = SetupResult::next(step);
    let json = serde_json::to_string(&result).unwrap();
    let back: SetupResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.status, SetupStatus::Next);
    assert_eq!(back.next_step.unwrap().fields[0].name, "bot_token");
}

#[test]
fn entity_and_relationship_wire_shape() {
    let entity = Entity {
        entity_type: "telegram.dm".to_string(),
        source: "telegram".to_string(),
        source_id: namespaced_id("telegram", "12345"),
        title: "Alice".to_string(),
        metadata: serde_json::json!({}),
    };
    let json = serde_json::to_string(&entity).unwrap();
    assert!(json.contains(r#""type":"telegram.dm""#));
    assert!(json.contains("telegram:12345"));

    let rel = Relationship {
        source_id: namespaced_id("telegram", "12345"),
        target_id: namespaced_id("telegram", "67890"),
        relationship_type: "dm_with".to_string(),
        source: "telegram".to_string(),
        metadata: serde_json::json!({}),
    };
    let json = serde_json::to_string(&rel).unwrap();
    assert!(json.contains(r#""type":"dm_with""#));
}

#[test]
fn tool_result_error_shape() {
    let result = ToolResult::error("chat not found");
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains(r#""is_error":true"#));
}
