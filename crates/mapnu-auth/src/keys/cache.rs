//! Provider public key cache
//!
//! The cache holds one [`KeySnapshot`]: every key the provider published at the
//! last successful fetch plus a single expiry instant. Snapshots are immutable and
//! swapped whole, so a reader holding one never sees a mix of old and new keys.
//!
//! Refresh is lazy. A lookup that finds the snapshot expired, or that misses a
//! key id (the provider may have rotated), fetches a new set while holding the
//! cache lock. Concurrent lookups queue on that lock instead of fetching again.
//!
//! A failed fetch leaves the previous snapshot in place and is reported only to
//! the lookup that triggered it. No fetch is started within `min_refresh_interval`
//! of the previous attempt, so during a provider outage lookups keep being served
//! from the stale snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::{KeyFetcher, KeySet, PublicKey};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult, FetchError};

/// Default snapshot lifetime
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
/// Default bound on a single fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default minimum spacing between fetch attempts
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Immutable key set with its expiry
#[derive(Debug)]
pub struct KeySnapshot {
    keys: HashMap<String, Arc<PublicKey>>,
    expires_at: Instant,
}

impl KeySnapshot {
    fn new(keys: KeySet, expires_at: Instant) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|(kid, key)| (kid, Arc::new(key)))
                .collect(),
            expires_at,
        }
    }

    /// Empty snapshot that is already expired
    fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            expires_at: Instant::now(),
        }
    }

    /// Look up a key by id
    pub fn get(&self, kid: &str) -> Option<&Arc<PublicKey>> {
        self.keys.get(kid)
    }

    /// Ids of all keys in the snapshot
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the snapshot holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// When the snapshot stops being trusted without a refresh
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether the snapshot has expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
struct CacheState {
    snapshot: Arc<KeySnapshot>,
    /// When the last fetch attempt finished, successful or not
    last_fetch: Option<Instant>,
}

/// TTL-bound, single-flight cache of the provider's public keys
#[derive(Debug)]
pub struct PublicKeyCache {
    fetcher: Arc<dyn KeyFetcher>,
    state: Mutex<CacheState>,
    ttl: Duration,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
}

impl PublicKeyCache {
    /// Create an empty cache with default settings
    ///
    /// - TTL: 1 hour
    /// - Fetch timeout: 10 seconds
    /// - Min refresh interval: 5 seconds
    pub fn new(fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self {
            fetcher,
            state: Mutex::new(CacheState {
                snapshot: Arc::new(KeySnapshot::empty()),
                last_fetch: None,
            }),
            ttl: DEFAULT_KEY_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }

    /// Create a cache using the timing settings from `config`
    pub fn from_config(config: &AuthConfig, fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self::new(fetcher)
            .with_ttl(config.key_cache_ttl)
            .with_fetch_timeout(config.key_fetch_timeout)
            .with_min_refresh_interval(config.min_refresh_interval)
    }

    /// Set the snapshot lifetime. Zero is raised to one second so an installed
    /// snapshot always expires in the future.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl.max(Duration::from_secs(1));
        self
    }

    /// Set the bound on a single fetch
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the minimum spacing between fetch attempts
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Resolve a key id, refreshing the key set first if needed.
    ///
    /// Performs at most one fetch per call.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyFetchFailed`] if a refresh was attempted and failed
    /// - [`AuthError::UnknownSigningKey`] if the current snapshot lacks `kid`
    pub async fn lookup(&self, kid: &str) -> AuthResult<Arc<PublicKey>> {
        let mut state = self.state.lock().await;
        let mut fetched = false;

        if state.snapshot.is_expired_at(Instant::now()) {
            if self.may_fetch(&state) {
                debug!(kid = kid, "Key snapshot expired, refreshing");
                fetched = true;
                self.refresh_locked(&mut state).await?;
            } else {
                debug!(kid = kid, "Key snapshot expired, refresh throttled; using stale keys");
            }
        }

        if let Some(key) = state.snapshot.get(kid) {
            debug!(kid = kid, "Key cache hit");
            return Ok(Arc::clone(key));
        }

        if !fetched && self.may_fetch(&state) {
            info!(kid = kid, "Unknown key id, refreshing key set");
            self.refresh_locked(&mut state).await?;
            if let Some(key) = state.snapshot.get(kid) {
                return Ok(Arc::clone(key));
            }
        }

        warn!(kid = kid, "Public key not found for kid");
        Err(AuthError::UnknownSigningKey {
            kid: kid.to_string(),
        })
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<KeySnapshot> {
        Arc::clone(&self.state.lock().await.snapshot)
    }

    /// Mark the current snapshot expired so the next lookup refreshes.
    /// Keys stay available if that refresh fails.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        let keys = state.snapshot.keys.clone();
        state.snapshot = Arc::new(KeySnapshot {
            keys,
            expires_at: Instant::now(),
        });
        state.last_fetch = None;
        debug!("Key snapshot invalidated");
    }

    fn may_fetch(&self, state: &CacheState) -> bool {
        state
            .last_fetch
            .is_none_or(|last| last.elapsed() >= self.min_refresh_interval)
    }

    async fn refresh_locked(&self, state: &mut CacheState) -> AuthResult<()> {
        let outcome = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch_keys()).await;
        state.last_fetch = Some(Instant::now());

        let keys = match outcome {
            Ok(Ok(keys)) => keys,
            Ok(Err(e)) => {
                error!(error = %e, stale_keys = state.snapshot.len(), "Key set refresh failed");
                return Err(AuthError::KeyFetchFailed(e));
            }
            Err(_) => {
                error!(
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    stale_keys = state.snapshot.len(),
                    "Key set refresh timed out"
                );
                return Err(AuthError::KeyFetchFailed(FetchError::Timeout(
                    self.fetch_timeout,
                )));
            }
        };

        let snapshot = KeySnapshot::new(keys, Instant::now() + self.ttl);
        info!(key_count = snapshot.len(), ttl_secs = self.ttl.as_secs(), "Installed key snapshot");
        state.snapshot = Arc::new(snapshot);
        Ok(())
    }
}
