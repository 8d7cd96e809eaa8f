use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single pre-configured agent served by this process.
///
/// Defaults describe the Wikipedia-style analyst: short, factual,
/// encyclopedia-like answers grounded with Google Search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Application name used to namespace agent sessions.
    #[serde(default = "d_app_name")]
    pub app_name: String,
    #[serde(default = "d_agent_name")]
    pub name: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_description")]
    pub description: String,
    #[serde(default = "d_instruction")]
    pub instruction: String,
    /// Enable the provider-side Google Search grounding tool.
    #[serde(default = "d_true")]
    pub google_search: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Gemini API base URL.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub auth: ApiKeyConfig,
    /// Upper bound on a single agent run, in seconds.
    #[serde(default = "d_120")]
    pub run_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: d_app_name(),
            name: d_agent_name(),
            model: d_model(),
            description: d_description(),
            instruction: d_instruction(),
            google_search: true,
            temperature: None,
            base_url: d_base_url(),
            auth: ApiKeyConfig::default(),
            run_timeout_secs: 120,
        }
    }
}

/// How the provider API key is resolved.
///
/// Precedence: `key` (plaintext) → OS keychain (`service` + `account`) →
/// environment variable `env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "d_key_env")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            key: None,
            env: d_key_env(),
            service: None,
            account: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_app_name() -> String {
    "wikichat".into()
}
fn d_agent_name() -> String {
    "wikipedia_analyst".into()
}
fn d_model() -> String {
    "gemini-2.5-flash".into()
}
fn d_description() -> String {
    "A knowledgeable agent that provides concise, factual information on any topic, \
     drawing from Wikipedia-like sources for accurate and summarized overviews."
        .into()
}
fn d_instruction() -> String {
    DEFAULT_INSTRUCTION.trim().into()
}
fn d_true() -> bool {
    true
}
fn d_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn d_key_env() -> Option<String> {
    Some("GEMINI_API_KEY".into())
}
fn d_120() -> u64 {
    120
}

const DEFAULT_INSTRUCTION: &str = r#"
You are a Wikipedia-style agent with vast knowledge on virtually any subject, from history and science to pop culture and current events. Your responses should always be short, factual, and neutral, mimicking encyclopedia entries without unnecessary details or opinions.

Primary Responsibilities:
- Answer queries with brief, accurate summaries.
- Cover key facts, definitions, timelines, or explanations in 3-5 sentences max.
- If the topic is broad, focus on essentials; suggest narrowing for depth if needed.
- Use simple language accessible to all users.
- Cite sources implicitly by referencing 'based on Wikipedia knowledge' if applicable.

Guidelines:
- Keep outputs under 200 words.
- Structure responses with a lead summary followed by bullet points for key details if helpful.
- Avoid fluff, promotions, or personal anecdotes.
- If information is uncertain or outdated, note it briefly.
- For complex queries, break down into core elements without expanding.
"#;
