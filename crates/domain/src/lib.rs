//! Shared types for wikichat: configuration, the error type, conversation
//! content, agent run events, and structured trace events.

pub mod config;
pub mod content;
pub mod error;
pub mod stream;
pub mod trace;

pub use content::{Content, Part};
pub use error::{Error, Result};
pub use stream::{BoxStream, RunEvent};
