//! Caller identity: who is talking to the agent.
//!
//! Bearer tokens are matched against the configured users by SHA-256
//! digest in constant time.  The resulting [`Caller`] maps to the stable
//! user id handed to the agent's session store: the user's numeric id for
//! authenticated callers, [`ANONYMOUS_USER_ID`] otherwise.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use wc_domain::config::{AuthConfig, UserAccount};
use wc_domain::error::{Error, Result};

/// External user id used for callers that did not authenticate.
pub const ANONYMOUS_USER_ID: &str = "anonymous_user";

/// A user that presented a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: u64,
    pub username: String,
}

/// Authentication state of one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Caller {
    Authenticated(AuthenticatedUser),
    #[default]
    Anonymous,
}

struct Credential {
    digest: [u8; 32],
    user: AuthenticatedUser,
}

/// Resolves bearer tokens to callers and callers to external user ids.
pub struct IdentityResolver {
    credentials: Vec<Credential>,
}

impl IdentityResolver {
    /// Build a resolver from the configured users.
    ///
    /// Token precedence per user: `token` → `token_env` → `token_sha256`.
    /// A user whose token env var is unset is skipped with a warning (they
    /// cannot log in until it is set and the server restarts).
    pub fn from_config(auth: &AuthConfig) -> Result<Self> {
        let mut credentials = Vec::with_capacity(auth.users.len());
        for account in &auth.users {
            match token_digest(account)? {
                Some(digest) => credentials.push(Credential {
                    digest,
                    user: AuthenticatedUser {
                        id: account.id,
                        username: account.username.clone(),
                    },
                }),
                None => tracing::warn!(
                    user_id = account.id,
                    username = %account.username,
                    "no token available for user; login disabled"
                ),
            }
        }

        tracing::info!(users = credentials.len(), "identity resolver ready");
        Ok(Self { credentials })
    }

    /// Resolve a presented bearer token.  Unknown or missing tokens yield
    /// [`Caller::Anonymous`].
    pub fn authenticate(&self, token: Option<&str>) -> Caller {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Caller::Anonymous;
        };
        let presented = Sha256::digest(token.as_bytes());

        // Compare against every credential so timing does not reveal the
        // position of a match.
        let mut found: Option<&AuthenticatedUser> = None;
        for cred in &self.credentials {
            if bool::from(presented.as_slice().ct_eq(&cred.digest)) {
                found = Some(&cred.user);
            }
        }

        match found {
            Some(user) => Caller::Authenticated(user.clone()),
            None => Caller::Anonymous,
        }
    }

    /// The stable identifier the agent's session store knows this caller by.
    pub fn external_user_id(caller: &Caller) -> String {
        match caller {
            Caller::Authenticated(user) => user.id.to_string(),
            Caller::Anonymous => ANONYMOUS_USER_ID.to_owned(),
        }
    }

    /// Number of users able to authenticate.
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

fn token_digest(account: &UserAccount) -> Result<Option<[u8; 32]>> {
    if let Some(ref token) = account.token {
        tracing::warn!(
            username = %account.username,
            "user token loaded from plaintext config field 'token'; prefer 'token_env' or 'token_sha256'"
        );
        return Ok(Some(sha256(token.as_bytes())));
    }

    if let Some(ref env_var) = account.token_env {
        return Ok(std::env::var(env_var)
            .ok()
            .filter(|t| !t.is_empty())
            .map(|t| sha256(t.as_bytes())));
    }

    if let Some(ref hex_digest) = account.token_sha256 {
        let bytes = hex::decode(hex_digest).map_err(|e| {
            Error::Config(format!("auth user {}: token_sha256: {e}", account.username))
        })?;
        let digest: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::Config(format!(
                "auth user {}: token_sha256 must be 32 bytes",
                account.username
            ))
        })?;
        return Ok(Some(digest));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: u64, name: &str) -> UserAccount {
        UserAccount {
            id,
            username: name.into(),
            token: None,
            token_env: None,
            token_sha256: None,
        }
    }

    fn resolver() -> IdentityResolver {
        let mut alice = account(1, "alice");
        alice.token = Some("alice-secret".into());
        let mut bob = account(2, "bob");
        bob.token_sha256 = Some(hex::encode(Sha256::digest(b"bob-secret")));
        IdentityResolver::from_config(&AuthConfig {
            users: vec![alice, bob],
        })
        .unwrap()
    }

    fn authenticated(caller: Caller) -> Option<AuthenticatedUser> {
        match caller {
            Caller::Authenticated(user) => Some(user),
            Caller::Anonymous => None,
        }
    }

    #[test]
    fn plaintext_and_digest_tokens_authenticate() {
        let r = resolver();
        assert_eq!(r.len(), 2);
        let alice = r.authenticate(Some("alice-secret"));
        assert_eq!(authenticated(alice).map(|u| u.id), Some(1));
        let bob = r.authenticate(Some("bob-secret"));
        assert_eq!(authenticated(bob).map(|u| u.username), Some("bob".to_owned()));
    }

    #[test]
    fn unknown_or_missing_token_is_anonymous() {
        let r = resolver();
        assert_eq!(r.authenticate(Some("nope")), Caller::Anonymous);
        assert_eq!(r.authenticate(Some("")), Caller::Anonymous);
        assert_eq!(r.authenticate(None), Caller::Anonymous);
    }

    #[test]
    fn external_user_id_is_stable() {
        let r = resolver();
        let first = IdentityResolver::external_user_id(&r.authenticate(Some("alice-secret")));
        let second = IdentityResolver::external_user_id(&r.authenticate(Some("alice-secret")));
        assert_eq!(first, "1");
        assert_eq!(first, second);
        assert_eq!(
            IdentityResolver::external_user_id(&Caller::Anonymous),
            ANONYMOUS_USER_ID
        );
    }

    #[test]
    fn missing_env_token_skips_user() {
        let mut carol = account(3, "carol");
        carol.token_env = Some("WC_TEST_TOKEN_NOT_SET_31337".into());
        let r = IdentityResolver::from_config(&AuthConfig { users: vec![carol] }).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn env_token_authenticates() {
        let var = "WC_TEST_TOKEN_DAVE_4242";
        std::env::set_var(var, "dave-secret");
        let mut dave = account(4, "dave");
        dave.token_env = Some(var.into());
        let r = IdentityResolver::from_config(&AuthConfig { users: vec![dave] }).unwrap();
        assert_eq!(authenticated(r.authenticate(Some("dave-secret"))).map(|u| u.id), Some(4));
        std::env::remove_var(var);
    }

    #[test]
    fn bad_digest_is_config_error() {
        let mut eve = account(5, "eve");
        eve.token_sha256 = Some("zz".into());
        let err = IdentityResolver::from_config(&AuthConfig { users: vec![eve] })
            .err()
            .expect("expected config error");
        assert!(err.to_string().contains("token_sha256"));
    }
}
