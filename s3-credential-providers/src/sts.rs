/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credentials issued by a Security Token Service
//!
//! [`AssumeRoleProvider`] trades a long-lived key pair for temporary credentials using the
//! `AssumeRole` action of the STS query protocol (version `2011-06-15`). MinIO and AWS both
//! implement it.

mod assume_role;
mod xml;

pub use assume_role::{builder, AssumeRoleProvider};
