//! Session management for wikichat.
//!
//! Bridges an authenticated web caller to the agent's session store:
//! caller identity resolution, a process-local cache of provisioned
//! sessions, idempotent session provisioning, and the append-only chat
//! history shown to users.

pub mod cache;
pub mod history;
pub mod identity;
pub mod provision;
pub mod store;

pub use cache::SessionCache;
pub use history::{ChatMessage, HistoryStore, Role};
pub use identity::{AuthenticatedUser, Caller, IdentityResolver, ANONYMOUS_USER_ID};
pub use provision::{Provisioned, SessionProvisioner};
pub use store::{AgentSession, LocalSessionService, SessionEvent, SessionService};
