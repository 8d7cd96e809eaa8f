use serde::{Deserialize, Serialize};

/// Role string for messages authored by the human side of a conversation.
pub const ROLE_USER: &str = "user";
/// Role string for messages authored by the model.
pub const ROLE_MODEL: &str = "model";

/// One message exchanged with the agent runner: a role plus ordered parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single content part.  Only text parts are produced by this system;
/// parts without text (e.g. inline data echoed back by a provider) are kept
/// so that part ordering is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

impl Content {
    /// Build the inbound message for a turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.into(),
            parts: vec![Part::text(text)],
        }
    }

    /// Build a model-authored message.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ROLE_MODEL.into(),
            parts: vec![Part::text(text)],
        }
    }

    /// Text of the first part, if the first part carries text.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().and_then(|p| p.text.as_deref())
    }

    /// All text parts joined in order.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
