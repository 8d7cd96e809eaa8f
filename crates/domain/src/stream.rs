use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::content::Content;

/// A boxed async stream, used for agent run event streams.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted while the agent runner executes one turn.
///
/// Consumers match exhaustively; only `FinalResponse` ends a turn
/// successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// Incremental text from the model.
    #[serde(rename = "partial")]
    Partial { text: String },

    /// The agent invoked a tool (e.g. a search query).
    #[serde(rename = "tool_call")]
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },

    /// The final response of the run.
    #[serde(rename = "final_response")]
    FinalResponse { content: Content },

    /// The run failed.
    #[serde(rename = "error")]
    Error { message: String },
}

impl RunEvent {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::Partial { .. } => "partial",
            RunEvent::ToolCall { .. } => "tool_call",
            RunEvent::FinalResponse { .. } => "final_response",
            RunEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_response_is_tagged() {
        let ev = RunEvent::FinalResponse {
            content: Content::model("done"),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "final_response");
        assert_eq!(json["content"]["parts"][0]["text"], "done");
    }
}
