/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use s3_credential_types::expiry::{self, DEFAULT_EXPIRY_MARGIN};
use s3_credential_types::provider::{self, future, CredentialsError, ProvideCredentials};
use s3_credential_types::time_source::SharedTimeSource;
use s3_credential_types::{Credentials, SharedCredentialsProvider};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, debug_span, trace, warn, Instrument};

/// `CredentialsCache` wraps a [`ProvideCredentials`] implementation and caches the credentials
/// it returns until they expire.
///
/// Cached credentials are refreshed when:
/// - nothing has been cached yet,
/// - the wrapped provider reports them expired,
/// - their own expiry falls within the expiry margin, or
/// - [`expire`](CredentialsCache::expire) was called.
///
/// At most one refresh runs at a time. Callers arriving while a refresh is in flight wait for it
/// and receive its outcome, credentials or error, instead of starting another one. A failed
/// refresh leaves the previously cached credentials in place (they are not served) and the
/// error is returned to the caller; the next `get` tries again. Credentials that are already
/// within the expiry margin when the provider hands them over are never cached: `get` returns
/// [`CredentialsError::CredentialsExpired`] for them instead.
///
/// # Examples
///
/// ```
/// use s3_credential_cache::CredentialsCache;
/// use s3_credential_types::Credentials;
///
/// # async fn docs() {
/// let cache = CredentialsCache::new(Credentials::from_keys("UXHW", "MYSECRET", None));
/// let credentials = cache.get().await.expect("static credentials");
/// assert_eq!(credentials.access_key_id(), "UXHW");
/// assert!(!cache.is_expired());
/// # }
/// ```
#[derive(Debug)]
pub struct CredentialsCache {
    provider: SharedCredentialsProvider,
    time_source: SharedTimeSource,
    expiry_margin: Duration,
    state: RwLock<State>,
    // held for the duration of a refresh
    refresh: Mutex<()>,
}

#[derive(Debug, Default)]
struct State {
    credentials: Option<Credentials>,
    force_expired: bool,
    /// Incremented by every call to `expire`
    expire_requests: u64,
    /// Incremented every time a refresh completes
    generation: u64,
    last_outcome: Option<provider::Result>,
}

impl CredentialsCache {
    /// Caches credentials from `provider` using the default settings
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self::builder().build(provider)
    }

    /// Returns a new `Builder` that can be used to construct a `CredentialsCache`.
    pub fn builder() -> builder::Builder {
        builder::Builder::new()
    }

    /// Returns valid credentials, refreshing them through the wrapped provider when needed.
    pub async fn get(&self) -> provider::Result {
        let observed = match self.cached() {
            Ok(credentials) => return Ok(credentials),
            Err(generation) => generation,
        };

        let _refresh = self.refresh.lock().await;
        let expire_requests = {
            let state = self.read();
            if state.generation != observed {
                if let Some(outcome) = &state.last_outcome {
                    trace!("credentials were refreshed while waiting");
                    return outcome.clone();
                }
            }
            state.expire_requests
        };

        let result = self
            .provider
            .provide_credentials()
            .instrument(debug_span!("refresh_credentials"))
            .await
            .and_then(|credentials| self.reject_expired(credentials));

        let mut state = self.write();
        state.generation = state.generation.wrapping_add(1);
        match &result {
            Ok(credentials) => {
                debug!(
                    provider = credentials.provider_name(),
                    expiry = ?credentials.expiry(),
                    "refreshed credentials"
                );
                state.credentials = Some(credentials.clone());
                // an `expire` issued while the provider was running still applies
                if state.expire_requests == expire_requests {
                    state.force_expired = false;
                }
            }
            Err(err) => warn!(error = %err, "failed to refresh credentials"),
        }
        state.last_outcome = Some(result.clone());
        result
    }

    /// Marks the cached credentials as expired; the next [`get`](CredentialsCache::get) refreshes.
    pub fn expire(&self) {
        let mut state = self.write();
        state.force_expired = true;
        state.expire_requests = state.expire_requests.wrapping_add(1);
    }

    /// Returns true if the next [`get`](CredentialsCache::get) would refresh the credentials.
    pub fn is_expired(&self) -> bool {
        self.cached().is_err()
    }

    /// Returns the cached credentials if they can be served, or the current refresh generation.
    fn cached(&self) -> Result<Credentials, u64> {
        let state = self.read();
        match &state.credentials {
            Some(credentials) if !state.force_expired && !self.is_stale(credentials) => {
                Ok(credentials.clone())
            }
            _ => Err(state.generation),
        }
    }

    fn is_stale(&self, credentials: &Credentials) -> bool {
        if self.provider.is_expired() {
            return true;
        }
        match credentials.expiry() {
            Some(expiration) => {
                expiry::is_expired(expiration, self.expiry_margin, self.time_source.now())
            }
            None => false,
        }
    }

    fn reject_expired(&self, credentials: Credentials) -> provider::Result {
        match credentials.expiry() {
            Some(expiration)
                if expiry::is_expired(expiration, self.expiry_margin, self.time_source.now()) =>
            {
                Err(CredentialsError::CredentialsExpired { expiration })
            }
            _ => Ok(credentials),
        }
    }

    // The guarded sections never panic, so a poisoned lock still holds consistent state.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProvideCredentials for CredentialsCache {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.get())
    }

    fn is_expired(&self) -> bool {
        CredentialsCache::is_expired(self)
    }
}

pub mod builder {
    use super::{CredentialsCache, State, DEFAULT_EXPIRY_MARGIN};
    use s3_credential_types::provider::ProvideCredentials;
    use s3_credential_types::time_source::SharedTimeSource;
    use s3_credential_types::SharedCredentialsProvider;
    use std::sync::RwLock;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Builder for constructing a [`CredentialsCache`].
    ///
    /// # Example
    ///
    /// ```
    /// use s3_credential_cache::CredentialsCache;
    /// use s3_credential_types::provider::provide_credentials_fn;
    /// use s3_credential_types::Credentials;
    /// use std::time::Duration;
    ///
    /// let cache = CredentialsCache::builder()
    ///     .expiry_margin(Duration::from_secs(30))
    ///     .build(provide_credentials_fn(|| async {
    ///         // An async process to retrieve credentials would go here:
    ///         Ok(Credentials::from_keys("example", "example", None))
    ///     }));
    /// assert!(cache.is_expired());
    /// ```
    #[derive(Debug, Default)]
    pub struct Builder {
        time_source: Option<SharedTimeSource>,
        expiry_margin: Option<Duration>,
    }

    impl Builder {
        pub fn new() -> Self {
            Default::default()
        }

        /// (Optional) Clock used to compare credential expirations against.
        /// Defaults to the system clock.
        pub fn time_source(mut self, time_source: SharedTimeSource) -> Self {
            self.time_source = Some(time_source);
            self
        }

        /// (Optional) How long before their expiry credentials are refreshed.
        /// Defaults to 10 seconds.
        pub fn expiry_margin(mut self, margin: Duration) -> Self {
            self.expiry_margin = Some(margin);
            self
        }

        /// Creates the [`CredentialsCache`] owning `provider`.
        pub fn build(self, provider: impl ProvideCredentials + 'static) -> CredentialsCache {
            CredentialsCache {
                provider: SharedCredentialsProvider::new(provider),
                time_source: self.time_source.unwrap_or_default(),
                expiry_margin: self.expiry_margin.unwrap_or(DEFAULT_EXPIRY_MARGIN),
                state: RwLock::new(State::default()),
                refresh: Mutex::new(()),
            }
        }
    }
}
