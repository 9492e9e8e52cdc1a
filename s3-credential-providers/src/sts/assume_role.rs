/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::fmt;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode, Uri};
use s3_credential_types::expiry::Expiry;
use s3_credential_types::provider::{self, future, ProvideCredentials};
use s3_credential_types::time_source::SharedTimeSource;
use s3_credential_types::{Credentials, CredentialsError};
use s3_sigv4::{sign_request, SigningParams, SigningSettings};

use crate::connector::{HttpConnector, SharedHttpConnector};
use crate::sts::xml::{self, AssumedCredentials, StsError, XmlDecodeError};

const PROVIDER_NAME: &str = "AssumeRole";
const STS_SERVICE: &str = "sts";
const STS_VERSION: &str = "2011-06-15";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_DURATION_SECONDS: u32 = 3600;
const MIN_DURATION_SECONDS: u32 = 900;
const MAX_DURATION_SECONDS: u32 = 43200;
const MAX_POLICY_LEN: usize = 2048;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bytes of an error response body kept for diagnostics
const MAX_ERROR_BODY_LEN: usize = 1024;

/// Temporary credentials from an STS `AssumeRole` exchange
///
/// Every call to [`provide_credentials`](ProvideCredentials::provide_credentials) sends one
/// SigV4-signed request to the token endpoint and does not retry. The provider reports itself
/// expired until the first successful exchange, then according to the expiration returned by
/// the token service less the expiry margin.
///
/// The provider does not cache: wrap it in a credentials cache so that concurrent callers share
/// one exchange.
///
/// ```rust,no_run
/// use s3_credential_providers::sts::AssumeRoleProvider;
/// # fn example() -> Result<(), s3_credential_types::CredentialsError> {
/// let provider = AssumeRoleProvider::builder()
///     .endpoint("http://localhost:9000")
///     .access_key("minio")
///     .secret_key("minio123")
///     .duration_seconds(3600)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct AssumeRoleProvider {
    endpoint: Uri,
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    region: String,
    form: Bytes,
    timeout: Duration,
    connector: SharedHttpConnector,
    time_source: SharedTimeSource,
    expiry: Expiry,
}

impl fmt::Debug for AssumeRoleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleProvider")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl AssumeRoleProvider {
    pub fn builder() -> builder::Builder {
        builder::Builder::default()
    }

    async fn credentials(&self) -> provider::Result {
        let request_time = self.time_source.now();
        let request = self.signed_request(request_time)?;
        tracing::debug!(endpoint = %self.endpoint, "requesting credentials from STS");

        let response =
            match tokio::time::timeout(self.timeout, self.connector.call(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return Err(CredentialsError::transport_error(err)),
                Err(_elapsed) => return Err(CredentialsError::ProviderTimedOut(self.timeout)),
            };
        tracing::debug!(status = %response.status(), "received STS response");

        let assumed = parse_response(&response, request_time)?;
        self.expiry.set_expiration(assumed.expiration);
        Ok(Credentials::new(
            assumed.access_key_id,
            assumed.secret_access_key,
            Some(assumed.session_token),
            Some(assumed.expiration),
            PROVIDER_NAME,
        ))
    }

    fn signed_request(&self, now: SystemTime) -> Result<http::Request<Bytes>, CredentialsError> {
        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(self.form.clone())
            .map_err(CredentialsError::unhandled)?;
        let params = SigningParams {
            access_key: &self.access_key,
            secret_key: &self.secret_key,
            security_token: self.session_token.as_deref(),
            region: &self.region,
            service_name: STS_SERVICE,
            time: now,
            settings: SigningSettings::default().with_content_sha256_header(true),
        };
        sign_request(&mut request, &params).map_err(CredentialsError::unhandled)?;
        Ok(request)
    }
}

impl ProvideCredentials for AssumeRoleProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }

    fn is_expired(&self) -> bool {
        self.expiry.is_expired()
    }
}

#[derive(Debug, thiserror::Error)]
enum ResponseError {
    #[error("STS returned an error: {code}: {message}")]
    Sts { code: String, message: String },
    #[error("unexpected status code {0}")]
    Status(StatusCode),
    #[error("response body is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("failed to parse AssumeRole response")]
    Xml(#[from] XmlDecodeError),
    #[error("STS returned credentials that expired before they were requested")]
    ExpiredOnArrival,
}

fn parse_response(
    response: &http::Response<Bytes>,
    request_time: SystemTime,
) -> Result<AssumedCredentials, CredentialsError> {
    let status = response.status();
    let body = response.body();
    let invalid = |cause: ResponseError| {
        CredentialsError::invalid_response(status.as_u16(), truncated(body), cause)
    };
    if !status.is_success() {
        let cause = match xml::parse_error_response(&String::from_utf8_lossy(body)) {
            Some(StsError { code, message }) => ResponseError::Sts {
                code: code.unwrap_or_else(|| "Unknown".to_string()),
                message: message.unwrap_or_default(),
            },
            None => ResponseError::Status(status),
        };
        return Err(invalid(cause));
    }
    let text = std::str::from_utf8(body).map_err(|err| invalid(err.into()))?;
    let assumed = xml::parse_assume_role_response(text).map_err(|err| invalid(err.into()))?;
    if assumed.expiration <= request_time {
        return Err(invalid(ResponseError::ExpiredOnArrival));
    }
    Ok(assumed)
}

fn truncated(body: &[u8]) -> String {
    String::from_utf8_lossy(&body[..body.len().min(MAX_ERROR_BODY_LEN)]).into_owned()
}

pub mod builder {
    use std::fmt;
    use std::time::Duration;

    use bytes::Bytes;
    use http::Uri;
    use s3_credential_types::expiry::{Expiry, DEFAULT_EXPIRY_MARGIN};
    use s3_credential_types::time_source::{SharedTimeSource, TimeSource};
    use s3_credential_types::CredentialsError;

    use super::{
        AssumeRoleProvider, DEFAULT_DURATION_SECONDS, DEFAULT_REGION, DEFAULT_TIMEOUT,
        MAX_DURATION_SECONDS, MAX_POLICY_LEN, MIN_DURATION_SECONDS, STS_VERSION,
    };
    use crate::connector::{
        default_connector, HttpConnector, SharedHttpConnector, DEFAULT_CONNECTOR_SUPPORTS_HTTPS,
    };

    #[derive(Debug, thiserror::Error)]
    enum ConfigError {
        #[error("an STS endpoint is required")]
        MissingEndpoint,
        #[error("invalid STS endpoint `{endpoint}`")]
        InvalidEndpoint {
            endpoint: String,
            source: http::uri::InvalidUri,
        },
        #[error("STS endpoint `{0}` must be an absolute http or https URL")]
        NotAbsolute(String),
        #[error("STS endpoint `{0}` needs an HTTPS connector: enable the `rustls` feature or set a connector")]
        HttpsUnsupported(String),
        #[error("{0} is required")]
        MissingKey(&'static str),
        #[error(
            "duration of {0} seconds is outside the allowed range of {} to {} seconds",
            MIN_DURATION_SECONDS,
            MAX_DURATION_SECONDS
        )]
        InvalidDuration(u32),
        #[error("policy is {0} bytes long, at most {} bytes are allowed", MAX_POLICY_LEN)]
        PolicyTooLong(usize),
    }

    /// Builder for [`AssumeRoleProvider`]
    ///
    /// Configuration is validated by [`build`](Builder::build); a provider that was built
    /// successfully only fails at request time.
    #[derive(Default)]
    pub struct Builder {
        endpoint: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
        session_token: Option<String>,
        region: Option<String>,
        duration_seconds: Option<u32>,
        role_arn: Option<String>,
        role_session_name: Option<String>,
        external_id: Option<String>,
        policy: Option<String>,
        timeout: Option<Duration>,
        expiry_margin: Option<Duration>,
        connector: Option<SharedHttpConnector>,
        time_source: Option<SharedTimeSource>,
    }

    impl fmt::Debug for Builder {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let redacted = |value: &Option<String>| value.as_ref().map(|_| "** redacted **");
            f.debug_struct("Builder")
                .field("endpoint", &self.endpoint)
                .field("access_key", &self.access_key)
                .field("secret_key", &redacted(&self.secret_key))
                .field("session_token", &redacted(&self.session_token))
                .field("region", &self.region)
                .field("duration_seconds", &self.duration_seconds)
                .field("role_arn", &self.role_arn)
                .field("role_session_name", &self.role_session_name)
                .field("external_id", &self.external_id)
                .field("policy", &self.policy)
                .field("timeout", &self.timeout)
                .field("expiry_margin", &self.expiry_margin)
                .field("connector", &self.connector)
                .field("time_source", &self.time_source)
                .finish()
        }
    }

    impl Builder {
        /// Token service URL, for example `https://sts.amazonaws.com` or the address of a
        /// MinIO server. Required.
        pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
            self.endpoint = Some(endpoint.into());
            self
        }

        /// Access key of the identity that signs the exchange. Required.
        pub fn access_key(mut self, access_key: impl Into<String>) -> Self {
            self.access_key = Some(access_key.into());
            self
        }

        /// Secret key of the identity that signs the exchange. Required.
        pub fn secret_key(mut self, secret_key: impl Into<String>) -> Self {
            self.secret_key = Some(secret_key.into());
            self
        }

        /// Session token of the signing identity, when it is itself temporary
        pub fn session_token(mut self, session_token: impl Into<String>) -> Self {
            self.session_token = Some(session_token.into());
            self
        }

        /// Region the exchange is signed for
        ///
        /// Defaults to `us-east-1`.
        pub fn region(mut self, region: impl Into<String>) -> Self {
            self.region = Some(region.into());
            self
        }

        /// Requested lifetime of the issued credentials
        ///
        /// Must be between 900 and 43200 seconds. Defaults to 3600 seconds.
        pub fn duration_seconds(mut self, duration_seconds: u32) -> Self {
            self.duration_seconds = Some(duration_seconds);
            self
        }

        pub fn role_arn(mut self, role_arn: impl Into<String>) -> Self {
            self.role_arn = Some(role_arn.into());
            self
        }

        pub fn role_session_name(mut self, role_session_name: impl Into<String>) -> Self {
            self.role_session_name = Some(role_session_name.into());
            self
        }

        pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
            self.external_id = Some(external_id.into());
            self
        }

        /// Session policy (JSON) further restricting the issued credentials
        ///
        /// At most 2048 bytes.
        pub fn policy(mut self, policy: impl Into<String>) -> Self {
            self.policy = Some(policy.into());
            self
        }

        /// Time allowed for one exchange, from sending the request until the response body
        /// has been read
        ///
        /// Defaults to 5 seconds.
        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        /// How long before the reported expiration the credentials are treated as expired
        ///
        /// Defaults to 10 seconds.
        pub fn expiry_margin(mut self, margin: Duration) -> Self {
            self.expiry_margin = Some(margin);
            self
        }

        /// HTTP connector used to reach the token service
        ///
        /// Defaults to a `hyper` client, with HTTPS support when the `rustls` feature is
        /// enabled.
        pub fn connector(mut self, connector: impl HttpConnector + 'static) -> Self {
            self.connector = Some(SharedHttpConnector::new(connector));
            self
        }

        /// Clock used for signing and for expiry decisions
        ///
        /// Defaults to the system clock.
        pub fn time_source(mut self, time_source: impl TimeSource + 'static) -> Self {
            self.time_source = Some(SharedTimeSource::new(time_source));
            self
        }

        pub fn build(self) -> Result<AssumeRoleProvider, CredentialsError> {
            let invalid = CredentialsError::invalid_configuration;

            let endpoint = self.endpoint.ok_or_else(|| invalid(ConfigError::MissingEndpoint))?;
            let uri: Uri = endpoint.parse().map_err(|source| {
                invalid(ConfigError::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    source,
                })
            })?;
            let https = match uri.scheme_str() {
                Some("https") => true,
                Some("http") => false,
                _ => return Err(invalid(ConfigError::NotAbsolute(endpoint))),
            };
            if uri.authority().is_none() {
                return Err(invalid(ConfigError::NotAbsolute(endpoint)));
            }
            if https && self.connector.is_none() && !DEFAULT_CONNECTOR_SUPPORTS_HTTPS {
                return Err(invalid(ConfigError::HttpsUnsupported(endpoint)));
            }

            let access_key = self
                .access_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| invalid(ConfigError::MissingKey("access key")))?;
            let secret_key = self
                .secret_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| invalid(ConfigError::MissingKey("secret key")))?;

            let duration_seconds = self.duration_seconds.unwrap_or(DEFAULT_DURATION_SECONDS);
            if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&duration_seconds) {
                return Err(invalid(ConfigError::InvalidDuration(duration_seconds)));
            }
            if let Some(policy) = &self.policy {
                if policy.len() > MAX_POLICY_LEN {
                    return Err(invalid(ConfigError::PolicyTooLong(policy.len())));
                }
            }

            let mut form = form_urlencoded::Serializer::new(String::new());
            form.append_pair("Action", "AssumeRole")
                .append_pair("Version", STS_VERSION)
                .append_pair("DurationSeconds", &duration_seconds.to_string());
            let optional = [
                ("RoleArn", &self.role_arn),
                ("RoleSessionName", &self.role_session_name),
                ("ExternalId", &self.external_id),
                ("Policy", &self.policy),
            ];
            for (name, value) in optional {
                if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
                    form.append_pair(name, value);
                }
            }

            let time_source = self.time_source.unwrap_or_default();
            Ok(AssumeRoleProvider {
                endpoint: uri,
                access_key,
                secret_key,
                session_token: self.session_token.filter(|token| !token.is_empty()),
                region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
                form: Bytes::from(form.finish()),
                timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
                connector: self.connector.unwrap_or_else(default_connector),
                expiry: Expiry::with_margin(
                    time_source.clone(),
                    self.expiry_margin.unwrap_or(DEFAULT_EXPIRY_MARGIN),
                ),
                time_source,
            })
        }
    }
}
