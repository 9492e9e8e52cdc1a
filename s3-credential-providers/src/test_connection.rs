/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Connectors for testing network credentials providers without a network

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use s3_credential_types::provider::BoxError;

use crate::connector::{BoxFuture, HttpConnector};

/// Test connection that replays a preloaded series of responses
///
/// Every request is recorded for later examination. Once the responses run out, further
/// requests fail with a transport error.
///
/// ```rust
/// use s3_credential_providers::test_connection::TestConnection;
/// let conn = TestConnection::new(vec![
///     http::Response::builder()
///         .status(200)
///         .body("<AssumeRoleResponse/>")
///         .unwrap(),
/// ]);
/// ```
#[derive(Clone, Debug)]
pub struct TestConnection {
    responses: Arc<Mutex<Vec<http::Response<Bytes>>>>,
    requests: Arc<Mutex<Vec<http::Request<Bytes>>>>,
}

impl TestConnection {
    pub fn new<B: Into<Bytes>>(responses: Vec<http::Response<B>>) -> Self {
        let mut responses: Vec<_> = responses
            .into_iter()
            .map(|response| response.map(Into::into))
            .collect();
        responses.reverse();
        TestConnection {
            responses: Arc::new(Mutex::new(responses)),
            requests: Default::default(),
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> impl Deref<Target = Vec<http::Request<Bytes>>> + '_ {
        lock(&self.requests)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl HttpConnector for TestConnection {
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, BoxError>> {
        lock(&self.requests).push(request);
        let response = lock(&self.responses)
            .pop()
            .ok_or_else(|| BoxError::from("no more test responses"));
        Box::pin(std::future::ready(response))
    }
}

/// Connection that fails every request as if nothing listened on the endpoint
#[derive(Clone, Debug, Default)]
pub struct UnreachableConnection;

impl HttpConnector for UnreachableConnection {
    fn call(
        &self,
        _request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, BoxError>> {
        let err: BoxError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused").into();
        Box::pin(std::future::ready(Err::<http::Response<Bytes>, _>(err)))
    }
}

/// Connection that never replies
#[derive(Clone, Debug, Default)]
pub struct NeverConnection;

impl HttpConnector for NeverConnection {
    fn call(
        &self,
        _request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, BoxError>> {
        Box::pin(std::future::pending::<Result<http::Response<Bytes>, BoxError>>())
    }
}
