/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use s3_credential_types::provider::{future, ProvideCredentials};
use s3_credential_types::{Credentials, SignerType};

const STATIC_PROVIDER: &str = "StaticProvider";

/// Credentials provider for a fixed key pair
///
/// The credentials never expire. Empty keys produce anonymous credentials, which storage
/// clients use to send unsigned requests.
///
/// ```rust
/// use s3_credential_providers::static_provider::StaticProvider;
/// let provider = StaticProvider::new("UXHW", "MYSECRET", None);
/// ```
#[derive(Clone, Debug)]
pub struct StaticProvider {
    credentials: Credentials,
}

impl StaticProvider {
    /// Static credentials signed with Signature Version 4
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::with_signer_type(
            access_key_id,
            secret_access_key,
            session_token,
            SignerType::V4,
        )
    }

    /// Static credentials signed with the legacy Signature Version 2
    pub fn new_v2(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self::with_signer_type(access_key_id, secret_access_key, None, SignerType::V2)
    }

    fn with_signer_type(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        signer_type: SignerType,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_PROVIDER,
        )
        .with_signer_type(signer_type);
        StaticProvider { credentials }
    }
}

impl From<Credentials> for StaticProvider {
    fn from(credentials: Credentials) -> Self {
        StaticProvider { credentials }
    }
}

impl ProvideCredentials for StaticProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Ok(self.credentials.clone()))
    }

    fn is_expired(&self) -> bool {
        false
    }
}
