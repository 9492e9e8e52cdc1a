/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::sync::atomic::{AtomicBool, Ordering};

use s3_credential_types::provider::{self, future, ProvideCredentials};
use s3_credential_types::Credentials;

use crate::os_shim_internal::Env;

const AWS_PROVIDER: &str = "EnvironmentVariable";
const MINIO_PROVIDER: &str = "MinioEnvironmentVariable";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Flavor {
    Aws,
    Minio,
}

/// Load credentials from the process environment
///
/// Two naming schemes are supported:
/// - [`aws`](Self::aws): `AWS_ACCESS_KEY_ID` (or `AWS_ACCESS_KEY`), `AWS_SECRET_ACCESS_KEY`
///   (or `AWS_SECRET_KEY`) and the optional `AWS_SESSION_TOKEN`
/// - [`minio`](Self::minio): `MINIO_ROOT_USER` (or `MINIO_ACCESS_KEY`) and
///   `MINIO_ROOT_PASSWORD` (or `MINIO_SECRET_KEY`)
///
/// Missing variables are not an error: the provider returns anonymous credentials so that a
/// [`ChainProvider`](crate::chain::ChainProvider) can move on to the next source. The provider
/// reports itself expired until it has read the environment once.
#[derive(Debug)]
pub struct EnvironmentVariableCredentialsProvider {
    env: Env,
    flavor: Flavor,
    retrieved: AtomicBool,
}

impl EnvironmentVariableCredentialsProvider {
    /// Reads AWS-style variable names from the real process environment
    pub fn aws() -> Self {
        Self::new_with_env(Flavor::Aws, Env::real())
    }

    /// Reads MinIO-style variable names from the real process environment
    pub fn minio() -> Self {
        Self::new_with_env(Flavor::Minio, Env::real())
    }

    /// Replaces the environment this provider reads from
    pub fn with_env(self, env: Env) -> Self {
        Self::new_with_env(self.flavor, env)
    }

    fn new_with_env(flavor: Flavor, env: Env) -> Self {
        EnvironmentVariableCredentialsProvider {
            env,
            flavor,
            retrieved: AtomicBool::new(false),
        }
    }

    /// First non-empty value among `names`
    fn var(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.env.get(name).ok())
            .find(|value| !value.is_empty())
    }

    fn credentials(&self) -> provider::Result {
        let credentials = match self.flavor {
            Flavor::Aws => Credentials::new(
                self.var(&["AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY"])
                    .unwrap_or_default(),
                self.var(&["AWS_SECRET_ACCESS_KEY", "AWS_SECRET_KEY"])
                    .unwrap_or_default(),
                self.var(&["AWS_SESSION_TOKEN"]),
                None,
                AWS_PROVIDER,
            ),
            Flavor::Minio => Credentials::new(
                self.var(&["MINIO_ROOT_USER", "MINIO_ACCESS_KEY"])
                    .unwrap_or_default(),
                self.var(&["MINIO_ROOT_PASSWORD", "MINIO_SECRET_KEY"])
                    .unwrap_or_default(),
                None,
                None,
                MINIO_PROVIDER,
            ),
        };
        self.retrieved.store(true, Ordering::Release);
        Ok(credentials)
    }
}

impl ProvideCredentials for EnvironmentVariableCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(self.credentials())
    }

    fn is_expired(&self) -> bool {
        !self.retrieved.load(Ordering::Acquire)
    }
}
