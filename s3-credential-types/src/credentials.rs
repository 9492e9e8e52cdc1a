/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Signature scheme a storage client should use with a set of [`Credentials`]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum SignerType {
    /// Signature Version 4
    V4,
    /// Legacy Signature Version 2
    V2,
    /// Requests are sent unsigned
    Anonymous,
}

impl Default for SignerType {
    fn default() -> Self {
        SignerType::V4
    }
}

impl SignerType {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, SignerType::Anonymous)
    }
}

/// Credentials used to authorize requests against an S3-compatible storage service
///
/// An opaque struct representing one usable credential set. Credentials are immutable once
/// constructed and cheap to clone: the fields live behind a shared pointer.
///
/// When `Credentials` are used with the caching layer, the `expiry` decides when the caching
/// layer asks the underlying provider for a replacement.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials(Arc<Inner>);

#[derive(Clone, Eq, PartialEq)]
struct Inner {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    signer_type: SignerType,

    /// Credential Expiry
    ///
    /// A timepoint at which the credentials should no longer be used because they have expired.
    /// If these credentials never expire, this value will be set to `None`.
    expires_after: Option<SystemTime>,

    provider_name: &'static str,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut creds = f.debug_struct("Credentials");
        creds
            .field("provider_name", &self.0.provider_name)
            .field("access_key_id", &self.0.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.0.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("signer_type", &self.0.signer_type);
        if let Some(expiry) = self.expiry() {
            match expiry.duration_since(UNIX_EPOCH) {
                Ok(since_epoch) => creds.field("expires_after", &since_epoch.as_secs()),
                Err(_) => creds.field("expires_after", &expiry),
            };
        } else {
            creds.field("expires_after", &"never");
        }
        creds.finish()
    }
}

const STATIC_CREDENTIALS: &str = "Static";

impl Credentials {
    /// Creates new credentials.
    ///
    /// The signer type is [`SignerType::V4`] unless either key is empty, in which case the
    /// credentials are anonymous.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_after: Option<SystemTime>,
        provider_name: &'static str,
    ) -> Self {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();
        let signer_type = if access_key_id.is_empty() || secret_access_key.is_empty() {
            SignerType::Anonymous
        } else {
            SignerType::V4
        };
        Credentials(Arc::new(Inner {
            access_key_id,
            secret_access_key,
            session_token: session_token.filter(|token| !token.is_empty()),
            signer_type,
            expires_after,
            provider_name,
        }))
    }

    /// Creates never-expiring credentials from a static key pair
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_CREDENTIALS,
        )
    }

    /// Credentials that carry no keys; requests made with them are sent unsigned
    pub fn anonymous(provider_name: &'static str) -> Self {
        Self::new("", "", None, None, provider_name)
    }

    /// Returns a copy of these credentials that uses `signer_type`.
    ///
    /// Anonymous credentials stay anonymous: there is nothing to sign with.
    pub fn with_signer_type(&self, signer_type: SignerType) -> Self {
        if self.0.signer_type.is_anonymous() {
            return self.clone();
        }
        let mut inner = self.0.as_ref().clone();
        inner.signer_type = signer_type;
        Credentials(Arc::new(inner))
    }

    pub fn access_key_id(&self) -> &str {
        &self.0.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.0.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }

    pub fn signer_type(&self) -> SignerType {
        self.0.signer_type
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.signer_type.is_anonymous()
    }

    pub fn expiry(&self) -> Option<SystemTime> {
        self.0.expires_after
    }

    pub fn provider_name(&self) -> &'static str {
        self.0.provider_name
    }
}
