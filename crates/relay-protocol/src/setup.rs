//! Setup wire format (§6), grounded on
//! `original_source/dev/types/setup_types.py`'s frozen Pydantic
//! models — the field set and the `next | error | complete` status enum
//! are carried over exactly; only the representation changes (serde
//! structs instead of Pydantic, immutability expressed by never exposing
//! `&mut` constructors rather than a `frozen=True` flag).

use serde::{Deserialize, Serialize};

/// One selectable option in a `select`/`multiselect` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupFieldOption {
    pub label: String,
    pub value: String,
}

/// The kind of input a setup field collects. `password` fields are never
/// echoed back in `status()` or logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupFieldKind {
    Text,
    Password,
    Number,
    Select,
    Multiselect,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupField {
    pub name: String,
    pub kind: SetupFieldKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SetupFieldOption>>,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupStep {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<SetupField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupFieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStatus {
    Next,
    Error,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupResult {
    pub status: SetupStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<SetupStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SetupFieldError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SetupResult {
    pub fn next(step: SetupStep) -> Self {
        Self {
            status: SetupStatus::Next,
            next_step: Some(step),
            errors: None,
            message: None,
        }
    }

    pub fn error(errors: Vec<SetupFieldError>) -> Self {
        Self {
            status: SetupStatus::Error,
            next_step: None,
            errors: Some(errors),
            message: None,
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            status: SetupStatus::Complete,
            next_step: None,
            errors: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_field_required_defaults_true() {
        let json = r#"{"name":"bot_token","kind":"password","label":"Bot token"}"#;
        let field: SetupField = serde_json::from_str(json).unwrap();
        assert!(field.required);
    }

    #[test]
    fn setup_result_complete_round_trips() {
        let result = SetupResult::complete("connected");
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""status":"complete""#));
        assert!(!json.contains("next_step"));
        let back: SetupResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, SetupStatus::Complete);
    }
}
