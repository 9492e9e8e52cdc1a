/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! HTTP transport used by network credentials providers

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use s3_credential_types::provider::BoxError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sends one fully-buffered HTTP request and buffers the response
///
/// Implementations own connection pooling and TLS. Errors are returned as-is to the
/// credentials provider, which reports them as transport errors.
pub trait HttpConnector: Send + Sync + fmt::Debug {
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, BoxError>>;
}

/// [`HttpConnector`] that can be shared between providers
#[derive(Clone, Debug)]
pub struct SharedHttpConnector(Arc<dyn HttpConnector>);

impl SharedHttpConnector {
    pub fn new(connector: impl HttpConnector + 'static) -> Self {
        SharedHttpConnector(Arc::new(connector))
    }
}

impl HttpConnector for SharedHttpConnector {
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, BoxError>> {
        self.0.call(request)
    }
}

/// [`HttpConnector`] backed by a `hyper` client
#[derive(Clone)]
pub struct HyperConnector<C = hyper::client::HttpConnector> {
    client: hyper::Client<C, hyper::Body>,
}

impl<C> fmt::Debug for HyperConnector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperConnector").finish()
    }
}

impl HyperConnector {
    /// Plain-text HTTP connector
    pub fn http() -> Self {
        HyperConnector {
            client: hyper::Client::new(),
        }
    }
}

#[cfg(feature = "rustls")]
impl HyperConnector<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>> {
    /// HTTPS connector trusting the Mozilla root certificates bundled by `webpki-roots`
    ///
    /// Plain `http://` endpoints are still accepted.
    pub fn https() -> Self {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        HyperConnector {
            client: hyper::Client::builder().build(https),
        }
    }
}

impl<C> HyperConnector<C> {
    /// Wraps an existing `hyper` client
    pub fn from_client(client: hyper::Client<C, hyper::Body>) -> Self {
        HyperConnector { client }
    }
}

impl<C> HttpConnector for HyperConnector<C>
where
    C: hyper::client::connect::Connect + Clone + Send + Sync + 'static,
{
    fn call(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'_, Result<http::Response<Bytes>, BoxError>> {
        Box::pin(async move {
            let response = self.client.request(request.map(hyper::Body::from)).await?;
            let (parts, body) = response.into_parts();
            let body = hyper::body::to_bytes(body).await?;
            Ok(http::Response::from_parts(parts, body))
        })
    }
}

/// Connector used when none is configured
pub(crate) fn default_connector() -> SharedHttpConnector {
    #[cfg(feature = "rustls")]
    {
        SharedHttpConnector::new(HyperConnector::https())
    }
    #[cfg(not(feature = "rustls"))]
    {
        SharedHttpConnector::new(HyperConnector::http())
    }
}

/// Whether [`default_connector`] can reach `https://` endpoints
pub(crate) const DEFAULT_CONNECTOR_SUPPORTS_HTTPS: bool = cfg!(feature = "rustls");
