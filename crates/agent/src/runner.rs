use async_trait::async_trait;

use wc_domain::content::Content;
use wc_domain::error::Result;
use wc_domain::stream::{BoxStream, RunEvent};

/// Executes one agent turn.
///
/// `run` returns `Err` when the turn cannot start at all (missing session,
/// provider rejected the request).  Failures after the stream has started
/// arrive as [`RunEvent::Error`].  A successful turn ends with exactly one
/// [`RunEvent::FinalResponse`].
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Namespace of the sessions this runner reads and writes.
    fn app_name(&self) -> &str;

    /// Name of the agent, used as the author of its session events.
    fn agent_name(&self) -> &str;

    async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        new_message: Content,
    ) -> Result<BoxStream<'static, RunEvent>>;
}
