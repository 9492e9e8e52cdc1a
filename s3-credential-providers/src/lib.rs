/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials providers for S3-compatible storage clients
//!
//! - [`StaticProvider`](static_provider::StaticProvider): a fixed key pair
//! - [`EnvironmentVariableCredentialsProvider`](environment::EnvironmentVariableCredentialsProvider):
//!   keys read from AWS-style or MinIO-style environment variables
//! - [`ChainProvider`](chain::ChainProvider): the first provider in a list that yields usable keys
//! - [`AssumeRoleProvider`](sts::AssumeRoleProvider): temporary credentials issued by a
//!   Security Token Service through the `AssumeRole` exchange
//!
//! Wrap any of them in `s3_credential_cache::CredentialsCache` to share one refresh between
//! concurrent callers.

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod chain;
pub mod connector;
pub mod environment;
pub mod os_shim_internal;
pub mod static_provider;
pub mod sts;

#[cfg(any(test, feature = "test-util"))]
pub mod test_connection;
