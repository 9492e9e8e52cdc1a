/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials for S3-compatible storage clients
//!
//! This crate holds the [`Credentials`] value, the [`ProvideCredentials`] capability implemented
//! by every credentials provider, and the [`expiry`] policy shared by all of them.

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod credentials;
pub mod expiry;
pub mod provider;
pub mod time_source;

pub use credentials::{Credentials, SignerType};
pub use provider::{CredentialsError, ProvideCredentials, SharedCredentialsProvider};
