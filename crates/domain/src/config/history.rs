use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat history
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory holding one `<user_id>.jsonl` log per user.
    #[serde(default = "d_history_path")]
    pub path: PathBuf,
    /// Maximum length of an inbound chat message, in characters.
    #[serde(default = "d_2048")]
    pub max_message_chars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: d_history_path(),
            max_message_chars: 2048,
        }
    }
}

fn d_history_path() -> PathBuf {
    PathBuf::from("./data/history")
}
fn d_2048() -> usize {
    2048
}
