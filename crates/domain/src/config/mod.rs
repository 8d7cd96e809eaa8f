mod agent;
mod auth;
mod history;
mod observability;
mod server;
mod sessions;

pub use agent::*;
pub use auth::*;
pub use history::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        if self.agent.app_name.trim().is_empty() {
            errors.push(ConfigError::error("agent.app_name", "app_name must not be empty"));
        }
        if self.agent.model.trim().is_empty() {
            errors.push(ConfigError::error("agent.model", "model must not be empty"));
        }
        if self.agent.base_url.trim().is_empty() {
            errors.push(ConfigError::error("agent.base_url", "base_url must not be empty"));
        }
        if self.agent.run_timeout_secs == 0 {
            errors.push(ConfigError::error(
                "agent.run_timeout_secs",
                "run timeout must be greater than 0",
            ));
        }

        if self.history.max_message_chars == 0 {
            errors.push(ConfigError::error(
                "history.max_message_chars",
                "max_message_chars must be greater than 0",
            ));
        }

        if self.auth.users.is_empty() {
            errors.push(ConfigError::warning(
                "auth.users",
                "no users configured; every API request will be rejected with 401",
            ));
        }
        let mut seen_ids = std::collections::HashSet::new();
        for (i, user) in self.auth.users.iter().enumerate() {
            if !seen_ids.insert(user.id) {
                errors.push(ConfigError::error(
                    format!("auth.users[{i}].id"),
                    format!("duplicate user id {}", user.id),
                ));
            }
            if user.username.trim().is_empty() {
                errors.push(ConfigError::error(
                    format!("auth.users[{i}].username"),
                    "username must not be empty",
                ));
            }
            if user.token.is_none() && user.token_env.is_none() && user.token_sha256.is_none() {
                errors.push(ConfigError::error(
                    format!("auth.users[{i}]"),
                    "one of token, token_env or token_sha256 is required",
                ));
            }
            if let Some(ref digest) = user.token_sha256 {
                let valid = digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit());
                if !valid {
                    errors.push(ConfigError::error(
                        format!("auth.users[{i}].token_sha256"),
                        "must be a 64-character hex SHA-256 digest",
                    ));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, name: &str) -> UserAccount {
        UserAccount {
            id,
            username: name.into(),
            token: Some(format!("tok-{id}")),
            token_env: None,
            token_sha256: None,
        }
    }

    #[test]
    fn default_config_only_warns_about_missing_users() {
        let issues = Config::default().validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Warning);
        assert_eq!(issues[0].field, "auth.users");
    }

    #[test]
    fn duplicate_user_ids_are_errors() {
        let mut config = Config::default();
        config.auth.users = vec![user(1, "alice"), user(1, "bob")];
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "auth.users[1].id"));
    }

    #[test]
    fn user_without_token_source_is_error() {
        let mut config = Config::default();
        let mut u = user(7, "carol");
        u.token = None;
        config.auth.users = vec![u];
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.field == "auth.users[0]"));
    }

    #[test]
    fn malformed_digest_is_error() {
        let mut config = Config::default();
        let mut u = user(2, "dave");
        u.token = None;
        u.token_sha256 = Some("abc".into());
        config.auth.users = vec![u];
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.field == "auth.users[0].token_sha256"));
    }

    #[test]
    fn zero_timeout_is_error() {
        let mut config = Config::default();
        config.agent.run_timeout_secs = 0;
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.field == "agent.run_timeout_secs"));
    }

    #[test]
    fn display_includes_severity_tag() {
        let e = ConfigError::error("server.port", "bad");
        assert_eq!(e.to_string(), "[ERROR] server.port: bad");
    }
}
