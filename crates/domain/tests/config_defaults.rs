use wc_domain::config::{Config, SessionBackend};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn default_message_limit_is_2048_chars() {
    let config = Config::default();
    assert_eq!(config.history.max_message_chars, 2048);
}

#[test]
fn default_session_backend_is_file() {
    let config = Config::default();
    assert_eq!(config.sessions.backend, SessionBackend::File);
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn full_config_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8080

[agent]
app_name = "wiki"

[sessions]
backend = "memory"

[history]
path = "/var/lib/wikichat/history"
max_message_chars = 512

[[auth.users]]
id = 42
username = "alice"
token_env = "ALICE_TOKEN"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.agent.app_name, "wiki");
    assert_eq!(config.sessions.backend, SessionBackend::Memory);
    assert_eq!(config.history.max_message_chars, 512);
    assert_eq!(config.auth.users[0].id, 42);
    assert!(config.validate().is_empty());
}

#[test]
fn resolved_config_survives_toml_roundtrip() {
    let config = Config::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed.agent.model, config.agent.model);
    assert_eq!(parsed.server.port, config.server.port);
}
