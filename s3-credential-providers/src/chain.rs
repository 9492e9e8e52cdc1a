/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::borrow::Cow;
use std::sync::Mutex;

use s3_credential_types::provider::{self, future, ProvideCredentials};
use s3_credential_types::Credentials;
use tracing::Instrument;

const CHAIN_PROVIDER: &str = "ChainProvider";

/// Credentials provider that checks a series of inner providers
///
/// Each provider will be checked in turn. The first provider that returns non-anonymous
/// credentials will be used and becomes the current provider: [`is_expired`] delegates to it.
/// Errors and anonymous credentials move on to the next provider. When every provider has been
/// tried, the chain returns anonymous credentials.
///
/// [`is_expired`]: ProvideCredentials::is_expired
///
/// ## Example
/// ```rust
/// use s3_credential_providers::chain::ChainProvider;
/// use s3_credential_providers::environment::EnvironmentVariableCredentialsProvider;
/// use s3_credential_providers::static_provider::StaticProvider;
/// let provider = ChainProvider::first_try("Environment", EnvironmentVariableCredentialsProvider::aws())
///     .or_else("Minio", EnvironmentVariableCredentialsProvider::minio())
///     .or_else("Static", StaticProvider::new("someacceskeyid", "somesecret", None));
/// ```
#[derive(Debug)]
pub struct ChainProvider {
    providers: Vec<(Cow<'static, str>, Box<dyn ProvideCredentials>)>,
    current: Mutex<Option<usize>>,
}

impl ChainProvider {
    pub fn first_try(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        ChainProvider {
            providers: vec![(name.into(), Box::new(provider))],
            current: Mutex::new(None),
        }
    }

    pub fn or_else(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.providers.push((name.into(), Box::new(provider)));
        self
    }

    fn set_current(&self, index: Option<usize>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = index;
    }

    async fn credentials(&self) -> provider::Result {
        for (index, (name, provider)) in self.providers.iter().enumerate() {
            let span = tracing::info_span!("load_credentials", provider = %name);
            match provider.provide_credentials().instrument(span).await {
                Ok(credentials) if !credentials.is_anonymous() => {
                    tracing::info!(provider = %name, "loaded credentials");
                    self.set_current(Some(index));
                    return Ok(credentials);
                }
                Ok(_) => {
                    tracing::info!(provider = %name, "provider in chain returned anonymous credentials")
                }
                Err(e) => {
                    tracing::info!(provider = %name, error = %e, "provider in chain did not provide credentials")
                }
            }
        }
        self.set_current(None);
        tracing::info!("no provider in chain returned credentials, using anonymous access");
        Ok(Credentials::anonymous(CHAIN_PROVIDER))
    }
}

impl ProvideCredentials for ChainProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }

    fn is_expired(&self) -> bool {
        let current = *self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current {
            Some(index) => self.providers[index].1.is_expired(),
            None => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::ChainProvider;
    use crate::environment::EnvironmentVariableCredentialsProvider;
    use crate::os_shim_internal::Env;
    use crate::static_provider::StaticProvider;
    use s3_credential_types::provider::{provide_credentials_fn, ProvideCredentials};
    use s3_credential_types::{CredentialsError, SignerType};

    #[test_log::test(tokio::test)]
    async fn first_usable_provider_wins() {
        let chain = ChainProvider::first_try(
            "Failing",
            provide_credentials_fn(|| async {
                Err(CredentialsError::provider_error("Custom error"))
            }),
        )
        .or_else("Anonymous", StaticProvider::new("", "", None))
        .or_else("Static", StaticProvider::new("UXHW", "MYSECRET", None))
        .or_else("Unused", StaticProvider::new("other", "other", None));

        assert!(chain.is_expired());
        let creds = chain.provide_credentials().await.expect("static provider");
        assert_eq!(creds.access_key_id(), "UXHW");
        assert!(!chain.is_expired());
    }

    #[test_log::test(tokio::test)]
    async fn exhausted_chain_is_anonymous() {
        let chain = ChainProvider::first_try(
            "Environment",
            EnvironmentVariableCredentialsProvider::aws().with_env(Env::from_slice(&[])),
        )
        .or_else(
            "Failing",
            provide_credentials_fn(|| async { Err(CredentialsError::CredentialsNotLoaded) }),
        );
        let creds = chain.provide_credentials().await.expect("anonymous, not an error");
        assert_eq!(creds.signer_type(), SignerType::Anonymous);
        assert!(chain.is_expired());
    }

    #[test_log::test(tokio::test)]
    async fn is_expired_follows_current_provider() {
        let chain = ChainProvider::first_try(
            "Environment",
            EnvironmentVariableCredentialsProvider::minio().with_env(Env::from_slice(&[
                ("MINIO_ROOT_USER", "minio"),
                ("MINIO_ROOT_PASSWORD", "minio123"),
            ])),
        )
        .or_else("Static", StaticProvider::new("UXHW", "MYSECRET", None));
        assert!(chain.is_expired());
        let creds = chain.provide_credentials().await.expect("env provider");
        assert_eq!(creds.access_key_id(), "minio");
        assert!(!chain.is_expired());
    }
}
