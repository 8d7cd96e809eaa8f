use wc_domain::config::{Config, ConfigSeverity};

/// Keychain service used when `agent.auth.service` is not configured.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "wikichat";
/// Keychain account used when `agent.auth.account` is not configured.
pub const DEFAULT_KEYCHAIN_ACCOUNT: &str = "gemini-api-key";

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when at least one error-severity issue is found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }
    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
/// Plaintext secrets are blanked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let mut redacted = config.clone();
    if redacted.agent.auth.key.is_some() {
        redacted.agent.auth.key = Some("********".into());
    }
    for user in &mut redacted.auth.users {
        if user.token.is_some() {
            user.token = Some("********".into());
        }
    }
    let output = toml::to_string_pretty(&redacted)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

/// Prompt for the Gemini API key and store it in the OS keychain under
/// the configured (or default) service and account.
pub fn set_secret(config: &Config) -> anyhow::Result<()> {
    let (service, account) = keychain_target(config);

    let secret = rpassword::prompt_password(format!("Gemini API key for {service}/{account}: "))
        .map_err(|e| anyhow::anyhow!("reading secret: {e}"))?;
    let secret = secret.trim();
    if secret.is_empty() {
        anyhow::bail!("empty secret, nothing stored");
    }

    wc_agent::util::store_in_keychain(&service, &account, secret)?;
    println!("Stored API key in the OS keychain ({service}/{account}).");

    if config.agent.auth.service.is_none() || config.agent.auth.account.is_none() {
        println!(
            "Add to config.toml so the server reads it:\n\n[agent.auth]\nservice = \"{service}\"\naccount = \"{account}\""
        );
    }
    Ok(())
}

fn keychain_target(config: &Config) -> (String, String) {
    let auth = &config.agent.auth;
    (
        auth.service
            .clone()
            .unwrap_or_else(|| DEFAULT_KEYCHAIN_SERVICE.into()),
        auth.account
            .clone()
            .unwrap_or_else(|| DEFAULT_KEYCHAIN_ACCOUNT.into()),
    )
}
