use serde::Serialize;

/// Structured trace events emitted across all wikichat crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionProvisioned {
        app_name: String,
        user_id: String,
        session_id: String,
        created: bool,
    },
    SessionCacheHit {
        user_id: String,
        session_id: String,
    },
    HistoryAppend {
        user_id: String,
        session_id: String,
        role: String,
        chars: usize,
    },
    AgentRunCompleted {
        user_id: String,
        session_id: String,
        events: usize,
        response_chars: usize,
        duration_ms: u64,
    },
    AgentRunFailed {
        user_id: String,
        session_id: String,
        reason: String,
        duration_ms: u64,
    },
    ProviderRequest {
        provider: String,
        model: String,
        streaming: bool,
        status: u16,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "wc_event");
    }
}
