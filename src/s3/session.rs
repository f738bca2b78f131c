//! Session token cache
//!
//! Holds at most one bearer token. Readers take a short read lock to check
//! freshness; a refresh runs with no lock held and then overwrites the slot,
//! so two tasks racing past a stale token may both log in. The last writer
//! wins, which is harmless because either token is valid on its own.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::s3::error::{Result, StorageError};

/// Default margin below the server's 8 hour token lifetime
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 7 * 60 * 60;

/// Upper bound for a configured token lifetime (30 days)
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 30 * 24 * 60 * 60;

/// A cached bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Maps the time a token was issued to the time it should be considered stale
pub type ExpiryEstimator = Arc<dyn Fn(DateTime<Utc>) -> DateTime<Utc> + Send + Sync>;

/// `issued_at + margin`, saturating at the latest representable time
pub fn fixed_margin(margin: Duration) -> ExpiryEstimator {
    Arc::new(move |issued_at| {
        issued_at
            .checked_add_signed(margin)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

/// Checked conversion of a configured lifetime in seconds
pub fn token_margin(seconds: i64) -> Result<Duration> {
    if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&seconds) {
        return Err(StorageError::InvalidConfig(format!(
            "token lifetime must be between 1 and {} seconds, got {}",
            MAX_TOKEN_LIFETIME_SECS, seconds
        )));
    }
    Duration::try_seconds(seconds).ok_or_else(|| {
        StorageError::InvalidConfig(format!("token lifetime {} is out of range", seconds))
    })
}

pub fn default_expiry_estimator() -> ExpiryEstimator {
    fixed_margin(Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
}

/// Shared, last-write-wins token slot
pub struct SessionCache {
    slot: RwLock<Option<SessionToken>>,
    estimator: ExpiryEstimator,
}

impl SessionCache {
    pub fn new(estimator: ExpiryEstimator) -> Self {
        Self {
            slot: RwLock::new(None),
            estimator,
        }
    }

    /// The cached token if it is still fresh at `now`
    pub async fn current_at(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| cached.is_fresh_at(now))
            .map(|cached| cached.token.clone())
    }

    pub async fn current(&self) -> Option<String> {
        self.current_at(Utc::now()).await
    }

    /// Overwrite the slot with a token issued at `issued_at`
    pub async fn store(&self, token: String, issued_at: DateTime<Utc>) -> SessionToken {
        let entry = SessionToken {
            token,
            expires_at: (self.estimator)(issued_at),
        };
        *self.slot.write().await = Some(entry.clone());
        debug!(expires_at = %entry.expires_at, "session token stored");
        entry
    }

    /// Drop the cached token so the next call logs in again
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        if slot.take().is_some() {
            debug!("session token invalidated");
        }
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.slot.read().await.as_ref().map(|cached| cached.expires_at)
    }

    /// Return the cached token, or run `refresh` and cache its result.
    ///
    /// No lock is held while `refresh` runs.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(token) = self.current().await {
            return Ok(token);
        }

        let issued_at = Utc::now();
        let token = refresh().await?;
        let entry = self.store(token, issued_at).await;
        info!(expires_at = %entry.expires_at, "session token refreshed");
        Ok(entry.token)
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(default_expiry_estimator())
    }
}

impl fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCache").finish_non_exhaustive()
    }
}
