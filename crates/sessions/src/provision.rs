//! Session provisioning.
//!
//! Before a chat turn runs, the agent session for `(app, user, session)`
//! must exist.  The provisioner consults the [`SessionCache`] first, then
//! the [`SessionService`]: an existing session is reused, a missing one is
//! created.  Concurrent requests for the same pair are serialized by a
//! per-key guard so at most one create reaches the store; a create that
//! still loses a race (another process, a restarted cache) and reports
//! `AlreadyExists` counts as success.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use wc_domain::error::{Error, Result};
use wc_domain::trace::TraceEvent;

use crate::cache::SessionCache;
use crate::store::SessionService;

/// How a provisioning call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// Already recorded in the process-local cache.
    Cached,
    /// Found in the session store.
    Found,
    /// Created in the session store by this call.
    Created,
}

pub struct SessionProvisioner {
    service: Arc<dyn SessionService>,
    cache: Arc<SessionCache>,
    in_flight: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionProvisioner {
    pub fn new(service: Arc<dyn SessionService>, cache: Arc<SessionCache>) -> Self {
        Self {
            service,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    /// Ensure the agent session exists.  The cache is only marked once the
    /// store confirmed or created the session.
    pub async fn ensure(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Provisioned> {
        if self.cache.has(user_id, session_id) {
            TraceEvent::SessionCacheHit {
                user_id: user_id.to_owned(),
                session_id: session_id.to_owned(),
            }
            .emit();
            return Ok(Provisioned::Cached);
        }

        let key = (user_id.to_owned(), session_id.to_owned());
        let guard = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let result = {
            let _held = guard.lock().await;
            self.ensure_locked(app_name, user_id, session_id).await
        };

        // Drop the guard entry once nobody else is waiting on it.
        drop(guard);
        {
            let mut in_flight = self.in_flight.lock();
            if let Some(entry) = in_flight.get(&key) {
                if Arc::strong_count(entry) == 1 {
                    in_flight.remove(&key);
                }
            }
        }

        result
    }

    async fn ensure_locked(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Provisioned> {
        // A waiter that queued behind the creator finds the cache filled.
        if self.cache.has(user_id, session_id) {
            return Ok(Provisioned::Cached);
        }

        let outcome = match self
            .service
            .get_session(app_name, user_id, session_id)
            .await?
        {
            Some(_) => Provisioned::Found,
            None => match self
                .service
                .create_session(app_name, user_id, session_id)
                .await
            {
                Ok(_) => Provisioned::Created,
                Err(Error::AlreadyExists(_)) => Provisioned::Found,
                Err(e) => return Err(e),
            },
        };

        self.cache.mark(user_id, session_id);
        TraceEvent::SessionProvisioned {
            app_name: app_name.to_owned(),
            user_id: user_id.to_owned(),
            session_id: session_id.to_owned(),
            created: outcome == Provisioned::Created,
        }
        .emit();

        Ok(outcome)
    }
}
