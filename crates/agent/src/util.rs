//! Provider plumbing shared by the runner and the CLI.

use wc_domain::config::ApiKeyConfig;
use wc_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the model API key.
///
/// Precedence:
/// 1. `key` field (plaintext, warned)
/// 2. `service` + `account` in the OS keychain
/// 3. `env` variable
/// 4. Headless keychain fallback: env var `{SERVICE}_{ACCOUNT}` uppercased
pub fn resolve_api_key(auth: &ApiKeyConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key'; \
             prefer 'env' or keychain 'service'+'account'"
        );
        return Ok(key.clone());
    }

    if let (Some(service), Some(account)) = (&auth.service, &auth.account) {
        match resolve_from_keychain(service, account) {
            Ok(secret) => return Ok(secret),
            Err(e) => tracing::warn!(
                service = %service,
                account = %account,
                error = %e,
                "keychain lookup failed, falling through to env"
            ),
        }
    }

    if let Some(ref env_var) = auth.env {
        if let Ok(val) = std::env::var(env_var) {
            if !val.is_empty() {
                return Ok(val);
            }
        }
    }

    if let (Some(service), Some(account)) = (&auth.service, &auth.account) {
        let fallback_var = keychain_fallback_env_name(service, account);
        if let Ok(val) = std::env::var(&fallback_var) {
            tracing::info!(env_var = %fallback_var, "API key resolved from keychain fallback env var");
            return Ok(val);
        }
    }

    match auth.env {
        Some(ref env_var) => Err(Error::Auth(format!(
            "no API key: environment variable '{env_var}' not set"
        ))),
        None => Err(Error::Auth(
            "no API key configured: set agent.auth 'key', 'env', or 'service'+'account'".into(),
        )),
    }
}

/// Read a secret from the OS keychain.
pub fn resolve_from_keychain(service: &str, account: &str) -> Result<String> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keyring entry creation failed: {e}")))?;
    entry
        .get_password()
        .map_err(|e| Error::Auth(format!("keyring get_password failed: {e}")))
}

/// Store a secret in the OS keychain (used by `wikichat config set-secret`).
pub fn store_in_keychain(service: &str, account: &str, secret: &str) -> Result<()> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keyring entry creation failed: {e}")))?;
    entry
        .set_password(secret)
        .map_err(|e| Error::Auth(format!("keyring set_password failed: {e}")))
}

/// Headless fallback env var name for a keychain service/account pair.
/// `("wikichat", "gemini-api-key")` → `"WIKICHAT_GEMINI_API_KEY"`.
pub fn keychain_fallback_env_name(service: &str, account: &str) -> String {
    format!(
        "{}_{}",
        service.to_uppercase().replace('-', "_"),
        account.to_uppercase().replace('-', "_"),
    )
}

/// Hide the `key=` query parameter of a URL for logging.
pub(crate) fn redact_url_key(url: &str) -> String {
    match url.find("key=") {
        Some(idx) => {
            let (prefix, rest) = url.split_at(idx + 4);
            let end = rest.find('&').unwrap_or(rest.len());
            format!("{prefix}[REDACTED]{}", &rest[end..])
        }
        None => url.to_string(),
    }
}
