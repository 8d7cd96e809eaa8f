//! Gemini-backed agent runner.
//!
//! One turn = one `streamGenerateContent?alt=sse` call.  The agent session
//! supplies the prior conversation; the user's message is recorded before
//! the call and the model's full answer after it, so the next turn sees
//! both.  Grounding is delegated to Gemini's built-in Google Search tool;
//! the search queries it reports surface as `ToolCall` events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use serde_json::Value;

use wc_domain::config::AgentConfig;
use wc_domain::content::{Content, ROLE_MODEL, ROLE_USER};
use wc_domain::error::{Error, Result};
use wc_domain::stream::{BoxStream, RunEvent};
use wc_domain::trace::TraceEvent;
use wc_sessions::{SessionEvent, SessionService};

use crate::definition::AgentDefinition;
use crate::runner::AgentRunner;
use crate::sse;
use crate::util::{from_reqwest, redact_url_key, resolve_api_key};

/// Tool name reported for Google Search grounding queries.
pub const GOOGLE_SEARCH_TOOL: &str = "google_search";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GeminiRunner {
    app_name: String,
    definition: AgentDefinition,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    sessions: Arc<dyn SessionService>,
}

impl GeminiRunner {
    /// Build the runner from config, resolving the API key.
    pub fn from_config(cfg: &AgentConfig, sessions: Arc<dyn SessionService>) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let runner = Self::new(
            &cfg.app_name,
            AgentDefinition::from_config(cfg),
            &cfg.base_url,
            api_key,
            Duration::from_secs(cfg.run_timeout_secs),
            sessions,
        )?;
        tracing::info!(
            app_name = %cfg.app_name,
            agent = %cfg.name,
            model = %cfg.model,
            google_search = cfg.google_search,
            "gemini runner ready"
        );
        Ok(runner)
    }

    pub fn new(
        app_name: &str,
        definition: AgentDefinition,
        base_url: &str,
        api_key: String,
        request_timeout: Duration,
        sessions: Arc<dyn SessionService>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            app_name: app_name.to_owned(),
            definition,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            sessions,
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.definition.model, self.api_key
        )
    }

    /// Request body: prior session events, then the new message.
    pub(crate) fn build_body(&self, history: &[SessionEvent], new_message: &Content) -> Value {
        let mut contents: Vec<Value> = history
            .iter()
            .filter_map(|ev| content_to_gemini(&ev.content))
            .collect();
        if let Some(msg) = content_to_gemini(new_message) {
            contents.push(msg);
        }

        let mut body = serde_json::json!({ "contents": contents });

        if !self.definition.instruction.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": self.definition.instruction }]
            });
        }
        if self.definition.google_search {
            body["tools"] = serde_json::json!([{ "google_search": {} }]);
        }
        if let Some(temp) = self.definition.temperature {
            body["generationConfig"] = serde_json::json!({ "temperature": temp });
        }

        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire format
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Text parts only; `None` when nothing is left to send.
fn content_to_gemini(content: &Content) -> Option<Value> {
    let parts: Vec<Value> = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .filter(|t| !t.is_empty())
        .map(|t| serde_json::json!({ "text": t }))
        .collect();
    if parts.is_empty() {
        return None;
    }
    let role = if content.role == ROLE_MODEL {
        ROLE_MODEL
    } else {
        ROLE_USER
    };
    Some(serde_json::json!({ "role": role, "parts": parts }))
}

/// What one streamed `GenerateContentResponse` contributed.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Chunk {
    pub texts: Vec<String>,
    pub search_queries: Vec<String>,
    pub finish_reason: Option<String>,
    pub block_reason: Option<String>,
}

pub(crate) fn parse_chunk(data: &str) -> Result<Chunk> {
    let v: Value = serde_json::from_str(data)?;
    let mut chunk = Chunk {
        block_reason: v
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
            .map(String::from),
        ..Default::default()
    };

    let Some(candidate) = v
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
    else {
        return Ok(chunk);
    };

    if let Some(parts) = candidate.pointer("/content/parts").and_then(Value::as_array) {
        for part in parts {
            // Thinking summaries are not part of the answer.
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    chunk.texts.push(text.to_string());
                }
            }
        }
    }

    if let Some(queries) = candidate
        .pointer("/groundingMetadata/webSearchQueries")
        .and_then(Value::as_array)
    {
        chunk.search_queries = queries
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect();
    }

    chunk.finish_reason = candidate
        .get("finishReason")
        .and_then(Value::as_str)
        .map(String::from);

    Ok(chunk)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl AgentRunner for GeminiRunner {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn agent_name(&self) -> &str {
        &self.definition.name
    }

    async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        new_message: Content,
    ) -> Result<BoxStream<'static, RunEvent>> {
        let session = self
            .sessions
            .get_session(&self.app_name, user_id, session_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("agent session {session_id} for user {user_id}"))
            })?;

        let body = self.build_body(&session.events, &new_message);
        self.sessions
            .append_event(
                &self.app_name,
                user_id,
                session_id,
                SessionEvent::new(ROLE_USER, new_message),
            )
            .await?;

        let url = self.stream_url();
        tracing::debug!(url = %redact_url_key(&url), history = session.events.len(), "gemini stream request");

        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        TraceEvent::ProviderRequest {
            provider: "gemini".into(),
            model: self.definition.model.clone(),
            streaming: true,
            status: status.as_u16(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: "gemini".into(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        let sessions = self.sessions.clone();
        let app_name = self.app_name.clone();
        let agent_name = self.definition.name.clone();
        let user_id = user_id.to_owned();
        let session_id = session_id.to_owned();

        let stream = async_stream::stream! {
            let mut payloads = sse::data_stream(resp);
            let mut answer = String::new();
            let mut seen_queries: HashSet<String> = HashSet::new();
            let mut finish_reason: Option<String> = None;

            while let Some(item) = payloads.next().await {
                let chunk = match item.and_then(|data| parse_chunk(&data)) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield RunEvent::Error { message: e.to_string() };
                        return;
                    }
                };

                if let Some(reason) = chunk.block_reason {
                    yield RunEvent::Error { message: format!("prompt blocked by model: {reason}") };
                    return;
                }
                for query in chunk.search_queries {
                    if seen_queries.insert(query.clone()) {
                        yield RunEvent::ToolCall {
                            name: GOOGLE_SEARCH_TOOL.into(),
                            arguments: serde_json::json!({ "query": query }),
                        };
                    }
                }
                for text in chunk.texts {
                    answer.push_str(&text);
                    yield RunEvent::Partial { text };
                }
                if chunk.finish_reason.is_some() {
                    finish_reason = chunk.finish_reason;
                }
            }

            if answer.trim().is_empty() {
                match finish_reason.as_deref() {
                    Some("STOP") | None => {
                        tracing::warn!(user_id = %user_id, session_id = %session_id, "model returned no text");
                    }
                    Some(other) => {
                        yield RunEvent::Error { message: format!("model stopped without an answer: {other}") };
                    }
                }
                return;
            }

            let content = Content::model(answer);
            let recorded = sessions
                .append_event(
                    &app_name,
                    &user_id,
                    &session_id,
                    SessionEvent::new(agent_name, content.clone()),
                )
                .await;
            match recorded {
                Ok(()) => yield RunEvent::FinalResponse { content },
                Err(e) => yield RunEvent::Error { message: format!("recording agent reply: {e}") },
            }
        };

        Ok(Box::pin(stream))
    }
}
