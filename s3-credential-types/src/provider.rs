/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The credentials provider capability
//!
//! A provider knows how to obtain a [`Credentials`] value and whether the last value it handed
//! out is still usable. Static keys implement [`ProvideCredentials`] directly:
//! ```rust
//! use s3_credential_types::provider::ProvideCredentials;
//! use s3_credential_types::Credentials;
//!
//! let creds = Credentials::from_keys("akid", "secret", None);
//! assert!(!creds.is_expired());
//! ```
//!
//! Dynamic providers usually define an inherent `async fn` and return it from the trait method:
//! ```rust
//! use s3_credential_types::provider::{self, future, CredentialsError, ProvideCredentials};
//! use s3_credential_types::Credentials;
//!
//! #[derive(Debug)]
//! struct SubprocessCredentialProvider;
//!
//! async fn invoke_command(command: &str) -> String {
//!     // implementation elided...
//!     # String::from("akid\nsecret")
//! }
//!
//! fn parse_credentials(creds: &str) -> provider::Result {
//!     let mut lines = creds.lines();
//!     let akid = lines.next().ok_or_else(|| CredentialsError::provider_error("invalid credentials"))?;
//!     let secret = lines.next().ok_or_else(|| CredentialsError::provider_error("invalid credentials"))?;
//!     Ok(Credentials::new(akid, secret, None, None, "CustomCommand"))
//! }
//!
//! impl SubprocessCredentialProvider {
//!     async fn load_credentials(&self) -> provider::Result {
//!         let creds = invoke_command("load-credentials.py").await;
//!         parse_credentials(&creds)
//!     }
//! }
//!
//! impl ProvideCredentials for SubprocessCredentialProvider {
//!     fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
//!     where
//!         Self: 'a,
//!     {
//!         future::ProvideCredentials::new(self.load_credentials())
//!     }
//!
//!     fn is_expired(&self) -> bool {
//!         true
//!     }
//! }
//! ```

use crate::expiry::Expiry;
use crate::time_source::SharedTimeSource;
use crate::Credentials;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Boxed error used for constructing [`CredentialsError`]s
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

type SharedError = Arc<dyn Error + Send + Sync + 'static>;

fn share(source: impl Into<BoxError>) -> SharedError {
    let source: BoxError = source.into();
    Arc::from(source)
}

/// Error returned when credentials could not be produced
///
/// Errors are cheap to clone so that every caller waiting on the same refresh observes the same
/// failure.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CredentialsError {
    /// No credentials were available for this provider
    CredentialsNotLoaded,

    /// The provider was given an invalid configuration
    ///
    /// For example:
    /// - a session duration outside of the range accepted by the token service
    /// - a missing or malformed endpoint
    InvalidConfiguration(SharedError),

    /// The request for credentials could not be sent or no response was received
    TransportError(SharedError),

    /// Loading credentials from this provider exceeded the maximum allowed duration
    ProviderTimedOut(Duration),

    /// A response was received but it was not a well-formed success response
    InvalidResponse {
        /// HTTP status code of the response
        status: u16,
        /// The response body, possibly truncated
        body: String,
        cause: SharedError,
    },

    /// The provider returned credentials that are already expired, or that expire within the
    /// expiry margin
    ///
    /// Such credentials are never handed out: a request signed with them would be rejected.
    CredentialsExpired {
        /// Expiration reported for the rejected credentials
        expiration: SystemTime,
    },

    /// The provider experienced an error during credential resolution
    ///
    /// The message of the underlying error is displayed as-is.
    ProviderError(SharedError),

    /// An unexpected error occurred during credential resolution
    Unhandled(SharedError),
}

impl CredentialsError {
    pub fn invalid_configuration(source: impl Into<BoxError>) -> Self {
        CredentialsError::InvalidConfiguration(share(source))
    }

    pub fn transport_error(source: impl Into<BoxError>) -> Self {
        CredentialsError::TransportError(share(source))
    }

    pub fn invalid_response(
        status: u16,
        body: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        CredentialsError::InvalidResponse {
            status,
            body: body.into(),
            cause: share(cause),
        }
    }

    pub fn provider_error(source: impl Into<BoxError>) -> Self {
        CredentialsError::ProviderError(share(source))
    }

    pub fn unhandled(source: impl Into<BoxError>) -> Self {
        CredentialsError::Unhandled(share(source))
    }

    /// Returns true if this error was caused by an invalid provider configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, CredentialsError::InvalidConfiguration(_))
    }

    /// Returns true if the token service could not be reached, including timeouts
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            CredentialsError::TransportError(_) | CredentialsError::ProviderTimedOut(_)
        )
    }
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::CredentialsNotLoaded => write!(
                f,
                "the provider could not provide credentials or required configuration was not set"
            ),
            CredentialsError::InvalidConfiguration(err) => {
                write!(f, "the credentials provider was not properly configured: {}", err)
            }
            CredentialsError::TransportError(err) => {
                write!(f, "failed to send credentials request: {}", err)
            }
            CredentialsError::ProviderTimedOut(d) => write!(
                f,
                "credentials provider timed out after {} seconds",
                d.as_secs()
            ),
            CredentialsError::InvalidResponse {
                status,
                body,
                cause,
            } => write!(
                f,
                "invalid credentials response (HTTP {}): {}; response body: {:?}",
                status, cause, body
            ),
            CredentialsError::CredentialsExpired { expiration } => {
                write!(f, "the provider returned expired credentials")?;
                match expiration.duration_since(UNIX_EPOCH) {
                    Ok(since_epoch) => {
                        write!(f, " (expiration: {}s after epoch)", since_epoch.as_secs())
                    }
                    Err(_) => Ok(()),
                }
            }
            CredentialsError::ProviderError(err) => write!(f, "{}", err),
            CredentialsError::Unhandled(err) => write!(f, "unexpected credentials error: {}", err),
        }
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialsError::InvalidConfiguration(err)
            | CredentialsError::TransportError(err)
            | CredentialsError::ProviderError(err)
            | CredentialsError::Unhandled(err)
            | CredentialsError::InvalidResponse { cause: err, .. } => Some(err.as_ref() as _),
            CredentialsError::CredentialsNotLoaded
            | CredentialsError::ProviderTimedOut(_)
            | CredentialsError::CredentialsExpired { .. } => None,
        }
    }
}

pub type Result = std::result::Result<Credentials, CredentialsError>;

pub mod future {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    /// Future returned by [`ProvideCredentials::provide_credentials`](super::ProvideCredentials)
    ///
    /// Resolves without allocating when the credentials are already at hand.
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct ProvideCredentials<'a>(Inner<'a>);

    enum Inner<'a> {
        Now(Option<super::Result>),
        Later(BoxFuture<'a, super::Result>),
    }

    impl<'a> ProvideCredentials<'a> {
        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            ProvideCredentials(Inner::Later(Box::pin(future)))
        }

        pub fn ready(credentials: super::Result) -> Self {
            ProvideCredentials(Inner::Now(Some(credentials)))
        }
    }

    impl fmt::Debug for ProvideCredentials<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match &self.0 {
                Inner::Now(value) => f.debug_tuple("ProvideCredentials::Now").field(value).finish(),
                Inner::Later(_) => f.write_str("ProvideCredentials::Later"),
            }
        }
    }

    impl Future for ProvideCredentials<'_> {
        type Output = super::Result;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match &mut self.get_mut().0 {
                Inner::Now(value) => {
                    Poll::Ready(value.take().expect("cannot be polled after completion"))
                }
                Inner::Later(future) => future.as_mut().poll(cx),
            }
        }
    }
}

/// Credentials provider capability
///
/// `provide_credentials` performs whatever work is needed to obtain usable credentials: nothing
/// for static keys, a full network exchange for a token service. `is_expired` is a local check
/// of the state the provider tracks about the last credentials it returned. Providers that
/// cannot tell must report `true` until they have produced credentials at least once.
pub trait ProvideCredentials: Send + Sync + Debug {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a;

    fn is_expired(&self) -> bool;
}

impl ProvideCredentials for Credentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Ok(self.clone()))
    }

    fn is_expired(&self) -> bool {
        false
    }
}

impl ProvideCredentials for Arc<dyn ProvideCredentials> {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().provide_credentials()
    }

    fn is_expired(&self) -> bool {
        self.as_ref().is_expired()
    }
}

/// Credentials provider that can be shared between owners
#[derive(Clone, Debug)]
pub struct SharedCredentialsProvider(Arc<dyn ProvideCredentials>);

impl SharedCredentialsProvider {
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self(Arc::new(provider))
    }
}

impl AsRef<dyn ProvideCredentials> for SharedCredentialsProvider {
    fn as_ref(&self) -> &(dyn ProvideCredentials + 'static) {
        self.0.as_ref()
    }
}

impl From<Arc<dyn ProvideCredentials>> for SharedCredentialsProvider {
    fn from(provider: Arc<dyn ProvideCredentials>) -> Self {
        SharedCredentialsProvider(provider)
    }
}

impl ProvideCredentials for SharedCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.0.provide_credentials()
    }

    fn is_expired(&self) -> bool {
        self.0.is_expired()
    }
}

/// A [`ProvideCredentials`] implemented by a closure.
///
/// Expiry is tracked from the credentials the closure returns: expired until the first
/// success, then according to the returned credentials' own expiry.
pub struct ProvideCredentialsFn<T> {
    f: T,
    expiry: Expiry,
}

impl<T> Debug for ProvideCredentialsFn<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialsFn")
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl<T, F> ProvideCredentialsFn<T>
where
    T: Fn() -> F + Send + Sync,
    F: Future<Output = Result> + Send + 'static,
{
    async fn load(&self) -> Result {
        let credentials = (self.f)().await?;
        self.expiry.set(credentials.expiry());
        Ok(credentials)
    }
}

impl<T, F> ProvideCredentials for ProvideCredentialsFn<T>
where
    T: Fn() -> F + Send + Sync,
    F: Future<Output = Result> + Send + 'static,
{
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.load())
    }

    fn is_expired(&self) -> bool {
        self.expiry.is_expired()
    }
}

/// Returns a new credentials provider built with the given closure
///
/// # Examples
///
/// ```no_run
/// use s3_credential_types::Credentials;
/// use s3_credential_types::provider::provide_credentials_fn;
///
/// async fn load_credentials() -> Credentials {
///     todo!()
/// }
///
/// provide_credentials_fn(|| async {
///     // Async process to retrieve credentials goes here
///     let credentials = load_credentials().await;
///     Ok(credentials)
/// });
/// ```
pub fn provide_credentials_fn<T, F>(f: T) -> ProvideCredentialsFn<T>
where
    T: Fn() -> F + Send + Sync,
    F: Future<Output = Result> + Send + 'static,
{
    ProvideCredentialsFn {
        f,
        expiry: Expiry::new(SharedTimeSource::default()),
    }
}

#[cfg(test)]
mod test {
    use super::{future, provide_credentials_fn, CredentialsError, ProvideCredentials};
    use crate::Credentials;
    use std::error::Error;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn creds_are_send_sync() {
        assert_send_sync::<Credentials>();
        assert_send_sync::<CredentialsError>();
    }

    #[test]
    fn provider_error_displays_its_message() {
        let err = CredentialsError::provider_error("Custom error");
        assert_eq!(err.to_string(), "Custom error");
        assert_eq!(err.clone().to_string(), "Custom error");
    }

    #[test]
    fn invalid_response_keeps_diagnostics() {
        let err = CredentialsError::invalid_response(403, "<ErrorResponse/>", "AccessDenied");
        let message = err.to_string();
        assert!(message.contains("HTTP 403"), "{}", message);
        assert!(message.contains("<ErrorResponse/>"), "{}", message);
        assert_eq!(err.source().unwrap().to_string(), "AccessDenied");
    }

    #[test]
    fn expired_credentials_error() {
        let err = CredentialsError::CredentialsExpired {
            expiration: UNIX_EPOCH + Duration::from_secs(1440938160),
        };
        assert_eq!(
            err.to_string(),
            "the provider returned expired credentials (expiration: 1440938160s after epoch)"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn future_debug_impl() {
        let ready = future::ProvideCredentials::ready(Err(CredentialsError::CredentialsNotLoaded));
        assert!(format!("{:?}", ready).starts_with("ProvideCredentials::Now"));
        let later = future::ProvideCredentials::new(async {
            Err(CredentialsError::CredentialsNotLoaded)
        });
        assert_eq!(format!("{:?}", later), "ProvideCredentials::Later");
    }

    #[tokio::test]
    async fn static_credentials_never_expire() {
        let creds = Credentials::from_keys("UXHW", "MYSECRET", None);
        assert!(!creds.is_expired());
        let provided = creds.provide_credentials().await.unwrap();
        assert_eq!(provided, creds);
    }

    #[tokio::test]
    async fn fn_provider_tracks_expiry_of_returned_credentials() {
        let provider = provide_credentials_fn(|| async {
            Ok(Credentials::new("akid", "secret", None, None, "test"))
        });
        assert!(provider.is_expired());
        provider.provide_credentials().await.unwrap();
        assert!(!provider.is_expired());

        let short_lived = provide_credentials_fn(|| async {
            Ok(Credentials::new(
                "akid",
                "secret",
                None,
                Some(SystemTime::now() + Duration::from_secs(1)),
                "test",
            ))
        });
        short_lived.provide_credentials().await.unwrap();
        assert!(short_lived.is_expired());
    }

    #[tokio::test]
    async fn fn_provider_failure_stays_expired() {
        let provider =
            provide_credentials_fn(|| async { Err(CredentialsError::CredentialsNotLoaded) });
        assert!(provider.provide_credentials().await.is_err());
        assert!(provider.is_expired());
    }
}
