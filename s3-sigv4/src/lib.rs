/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! SigV4 signing for requests sent to a Security Token Service
//!
//! Only header-based signing of requests with an in-memory body is supported, which is all a
//! credential exchange needs.

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod date_fmt;
pub mod http_request;
pub mod sign;

pub use http_request::{sign_request, SigningError, SigningParams, SigningSettings};
