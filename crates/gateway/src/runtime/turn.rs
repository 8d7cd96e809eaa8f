//! Turn execution: drive one agent run and pick out the answer.
//!
//! The runner's event stream is consumed with an exhaustive match; the
//! first `FinalResponse` carrying text ends the turn.  Stream exhaustion
//! without one is an error, as is exceeding the run timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;

use wc_agent::AgentRunner;
use wc_domain::content::Content;
use wc_domain::stream::RunEvent;
use wc_domain::trace::TraceEvent;

use super::TurnError;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Text of the final response's first part.
    pub text: String,
    /// Names of the tools the agent invoked, in order.
    pub tool_calls: Vec<String>,
    /// Events consumed, including the final one.
    pub events: usize,
}

pub struct TurnExecutor {
    runner: Arc<dyn AgentRunner>,
    timeout: Duration,
}

impl TurnExecutor {
    pub fn new(runner: Arc<dyn AgentRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Send `text` to the agent for this conversation and wait for its
    /// final answer.
    pub async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<RunOutcome, TurnError> {
        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.consume(user_id, session_id, text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TurnError::Timeout(self.timeout)),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(outcome) => TraceEvent::AgentRunCompleted {
                user_id: user_id.to_owned(),
                session_id: session_id.to_owned(),
                events: outcome.events,
                response_chars: outcome.text.chars().count(),
                duration_ms,
            }
            .emit(),
            Err(e) => TraceEvent::AgentRunFailed {
                user_id: user_id.to_owned(),
                session_id: session_id.to_owned(),
                reason: e.to_string(),
                duration_ms,
            }
            .emit(),
        }

        result
    }

    async fn consume(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<RunOutcome, TurnError> {
        let mut stream = self
            .runner
            .run(user_id, session_id, Content::user(text))
            .await
            .map_err(|e| TurnError::AgentRun(e.to_string()))?;

        let mut events = 0usize;
        let mut tool_calls = Vec::new();

        while let Some(event) = stream.next().await {
            events += 1;
            match event {
                RunEvent::Partial { .. } => {}
                RunEvent::ToolCall { name, arguments } => {
                    tracing::debug!(tool = %name, arguments = %arguments, "agent tool call");
                    tool_calls.push(name);
                }
                RunEvent::FinalResponse { content } => match content.first_text() {
                    Some(answer) => {
                        return Ok(RunOutcome {
                            text: answer.to_owned(),
                            tool_calls,
                            events,
                        });
                    }
                    None => tracing::debug!("final response without text part, ignoring"),
                },
                RunEvent::Error { message } => return Err(TurnError::AgentRun(message)),
            }
        }

        Err(TurnError::NoFinalResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wc_domain::error::{Error, Result};
    use wc_domain::stream::BoxStream;

    /// Replays a fixed list of events, optionally after a delay.
    struct Scripted {
        events: Vec<RunEvent>,
        delay: Option<Duration>,
        fail_start: bool,
    }

    #[async_trait::async_trait]
    impl AgentRunner for Scripted {
        fn app_name(&self) -> &str {
            "app"
        }
        fn agent_name(&self) -> &str {
            "agent"
        }
        async fn run(&self, _: &str, _: &str, _: Content) -> Result<BoxStream<'static, RunEvent>> {
            if self.fail_start {
                return Err(Error::Provider {
                    provider: "gemini".into(),
                    message: "HTTP 500".into(),
                });
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Box::pin(futures_util::stream::iter(self.events.clone())))
        }
    }

    fn executor(events: Vec<RunEvent>) -> TurnExecutor {
        TurnExecutor::new(
            Arc::new(Scripted {
                events,
                delay: None,
                fail_start: false,
            }),
            Duration::from_secs(5),
        )
    }

    fn final_text(t: &str) -> RunEvent {
        RunEvent::FinalResponse {
            content: Content::model(t),
        }
    }

    #[tokio::test]
    async fn picks_first_final_response() {
        let exec = executor(vec![
            RunEvent::ToolCall {
                name: "google_search".into(),
                arguments: serde_json::json!({"query": "x"}),
            },
            RunEvent::Partial { text: "ans".into() },
            final_text("answer"),
            final_text("ignored"),
        ]);
        let out = exec.run("1", "s", "q").await.unwrap();
        assert_eq!(out.text, "answer");
        assert_eq!(out.tool_calls, vec!["google_search"]);
        assert_eq!(out.events, 3);
    }

    #[tokio::test]
    async fn final_response_without_parts_is_skipped() {
        let empty = RunEvent::FinalResponse {
            content: Content {
                role: "model".into(),
                parts: vec![],
            },
        };
        let exec = executor(vec![empty, final_text("real")]);
        assert_eq!(exec.run("1", "s", "q").await.unwrap().text, "real");
    }

    #[tokio::test]
    async fn exhausted_stream_is_no_final_response() {
        let exec = executor(vec![RunEvent::Partial { text: "..".into() }]);
        let err = exec.run("1", "s", "q").await.unwrap_err();
        assert!(matches!(err, TurnError::NoFinalResponse));
    }

    #[tokio::test]
    async fn error_event_fails_the_run() {
        let exec = executor(vec![
            RunEvent::Error {
                message: "quota exceeded".into(),
            },
            final_text("never"),
        ]);
        match exec.run("1", "s", "q").await.unwrap_err() {
            TurnError::AgentRun(msg) => assert_eq!(msg, "quota exceeded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_failure_is_agent_run_error() {
        let exec = TurnExecutor::new(
            Arc::new(Scripted {
                events: vec![],
                delay: None,
                fail_start: true,
            }),
            Duration::from_secs(5),
        );
        let err = exec.run("1", "s", "q").await.unwrap_err();
        assert!(matches!(err, TurnError::AgentRun(ref m) if m.contains("HTTP 500")));
    }

    #[tokio::test]
    async fn slow_run_times_out() {
        let exec = TurnExecutor::new(
            Arc::new(Scripted {
                events: vec![final_text("late")],
                delay: Some(Duration::from_millis(200)),
                fail_start: false,
            }),
            Duration::from_millis(20),
        );
        let err = exec.run("1", "s", "q").await.unwrap_err();
        assert!(matches!(err, TurnError::Timeout(_)));
    }
}
