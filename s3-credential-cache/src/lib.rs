/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credential caching for S3-compatible storage clients
//!
//! A storage client owns one [`CredentialsCache`] wrapping whichever credentials provider it
//! was configured with, and asks it for credentials before signing each request.

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod cache;

pub use cache::builder;
pub use cache::CredentialsCache;
