//! The conversational agent behind wikichat.
//!
//! [`AgentRunner`] is the seam the gateway drives a turn through;
//! [`GeminiRunner`] implements it against the Gemini streaming API, using
//! the shared [`SessionService`](wc_sessions::SessionService) as the
//! agent's memory.

pub mod definition;
pub mod gemini;
pub mod runner;
pub(crate) mod sse;
pub mod util;

use std::sync::Arc;

use wc_domain::config::AgentConfig;
use wc_domain::error::Result;
use wc_sessions::SessionService;

pub use definition::AgentDefinition;
pub use gemini::GeminiRunner;
pub use runner::AgentRunner;

/// Build the configured agent runner.
pub fn build_runner(
    cfg: &AgentConfig,
    sessions: Arc<dyn SessionService>,
) -> Result<Arc<dyn AgentRunner>> {
    let runner = GeminiRunner::from_config(cfg, sessions)?;
    Ok(Arc::new(runner))
}
