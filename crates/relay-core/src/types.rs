use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque remote-chat identifier.
///
/// Telegram peer ids are signed 64-bit integers whose sign and magnitude
/// encode the peer kind (user / chat / channel). Wrapping the raw wire
/// value in a string keeps that encoding out of the store and out of
/// every downstream component that only ever compares or displays ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for ChatId {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

/// Opaque remote-user identifier. Same rationale as [`ChatId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

/// Message identifier, scoped to a chat. Natural key is `(chat_id, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<i32> for MessageId {
    fn from(v: i32) -> Self {
        Self(v.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_displays_raw_value() {
        let id = ChatId::from(-1001234567890i64);
        assert_eq!(id.to_string(), "-1001234567890");
    }

    #[test]
    fn message_id_from_negative_i32_clamps_to_zero() {
        assert_eq!(MessageId::from(-5i32), MessageId(0));
    }
}
