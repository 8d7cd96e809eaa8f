pub mod config;
pub mod history;
pub mod run;

use clap::{Parser, Subcommand};

/// wikichat: a chat front end for a Wikipedia-style research agent.
#[derive(Debug, Parser)]
#[command(name = "wikichat", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Send one message to the agent as a configured user and print the answer.
    Run {
        /// The message to send.
        message: String,
        /// Numeric id of the configured user to act as.
        #[arg(long)]
        user: u64,
        /// Session id (a fresh one is generated when omitted).
        #[arg(long)]
        session: Option<String>,
    },
    /// Print a user's sessions, or one session's messages.
    History {
        /// Numeric id of the configured user.
        #[arg(long)]
        user: u64,
        /// Session id to print; lists all sessions when omitted.
        #[arg(long)]
        session: Option<String>,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
    /// Store the Gemini API key in the OS keychain.
    SetSecret,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `WC_CONFIG` (or `config.toml`
/// by default).  A missing file yields the defaults.  Returns the parsed
/// [`Config`](wc_domain::config::Config) and the path that was used.
pub fn load_config() -> anyhow::Result<(wc_domain::config::Config, String)> {
    let config_path = std::env::var("WC_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        wc_domain::config::Config::default()
    };

    Ok((config, config_path))
}
