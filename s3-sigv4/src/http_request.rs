/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Header-based SigV4 signing of `http::Request`s

use crate::date_fmt::{format_date, format_date_time};
use crate::sign::{calculate_signature, generate_signing_key, sha256_hex_string};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST, USER_AGENT};
use http::{Method, Request, Uri};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;
use tracing::trace;

pub(crate) const HMAC_256: &str = "AWS4-HMAC-SHA256";
pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
pub(crate) const X_AMZ_DATE: &str = "x-amz-date";
pub(crate) const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";

/// Characters left as-is by SigV4 URI encoding: `A-Z a-z 0-9 - _ . ~`
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SigningError {
    #[error("request URI has no authority to derive the host header from")]
    MissingAuthority,
    #[error("header `{name}` has a value that cannot be signed")]
    InvalidHeaderValue {
        name: HeaderName,
        #[source]
        source: http::header::ToStrError,
    },
    #[error("signing produced an invalid header value")]
    InvalidSignedValue(#[from] http::header::InvalidHeaderValue),
}

/// Settings that alter how a request is signed
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct SigningSettings {
    /// Add an `x-amz-content-sha256` header containing the payload hash
    pub content_sha256_header: bool,
}

impl SigningSettings {
    pub fn with_content_sha256_header(mut self, enabled: bool) -> Self {
        self.content_sha256_header = enabled;
        self
    }
}

/// Parameters to use when signing
pub struct SigningParams<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub security_token: Option<&'a str>,

    /// Region to sign for
    pub region: &'a str,
    /// Service name to sign for
    pub service_name: &'a str,
    /// Timestamp to use in the signature (should be `SystemTime::now()` unless testing)
    pub time: SystemTime,

    pub settings: SigningSettings,
}

impl fmt::Debug for SigningParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningParams")
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .field(
                "security_token",
                &self.security_token.map(|_| "** redacted **"),
            )
            .field("region", &self.region)
            .field("service_name", &self.service_name)
            .field("time", &self.time)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Signs `request` in place
///
/// Adds `host` (when missing), `x-amz-date`, optionally `x-amz-content-sha256` and
/// `x-amz-security-token`, then the `authorization` header. Every other header already present
/// on the request, except `user-agent`, is part of the signature.
pub fn sign_request<B: AsRef<[u8]>>(
    request: &mut Request<B>,
    params: &SigningParams<'_>,
) -> Result<(), SigningError> {
    let date_time = format_date_time(params.time);
    let payload_hash = sha256_hex_string(request.body().as_ref());

    if !request.headers().contains_key(HOST) {
        let authority = request
            .uri()
            .authority()
            .ok_or(SigningError::MissingAuthority)?;
        let host = HeaderValue::from_str(authority.as_str())?;
        request.headers_mut().insert(HOST, host);
    }
    let headers = request.headers_mut();
    headers.insert(
        HeaderName::from_static(X_AMZ_DATE),
        HeaderValue::from_str(&date_time)?,
    );
    if params.settings.content_sha256_header {
        headers.insert(
            HeaderName::from_static(X_AMZ_CONTENT_SHA_256),
            HeaderValue::from_str(&payload_hash)?,
        );
    }
    if let Some(token) = params.security_token {
        let mut token = HeaderValue::from_str(token)?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static(X_AMZ_SECURITY_TOKEN), token);
    }

    let creq = CanonicalRequest::from(request, payload_hash)?;
    trace!(canonical_request = %creq, "calculated canonical request");

    let scope = format!(
        "{}/{}/{}/aws4_request",
        format_date(params.time),
        params.region,
        params.service_name
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        HMAC_256,
        date_time,
        scope,
        sha256_hex_string(creq.to_string().as_bytes())
    );
    trace!(string_to_sign = %string_to_sign, "calculated string to sign");

    let signing_key = generate_signing_key(
        params.secret_key,
        params.time,
        params.region,
        params.service_name,
    );
    let signature = calculate_signature(signing_key, string_to_sign.as_bytes());
    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        HMAC_256, params.access_key, scope, creq.signed_headers, signature
    );
    let mut authorization = HeaderValue::from_str(&authorization)?;
    authorization.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, authorization);
    Ok(())
}

#[derive(Debug, PartialEq)]
struct CanonicalRequest<'a> {
    method: &'a Method,
    path: String,
    params: String,
    /// `(name, value)` pairs sorted by name
    headers: Vec<(&'a str, String)>,
    signed_headers: String,
    payload_hash: String,
}

impl<'a> CanonicalRequest<'a> {
    fn from<B>(request: &'a Request<B>, payload_hash: String) -> Result<Self, SigningError> {
        let mut headers: Vec<(&'a str, String)> = Vec::new();
        for name in request.headers().keys() {
            if *name == AUTHORIZATION || *name == USER_AGENT {
                continue;
            }
            let mut values = Vec::new();
            for value in request.headers().get_all(name) {
                let value = value
                    .to_str()
                    .map_err(|source| SigningError::InvalidHeaderValue {
                        name: name.clone(),
                        source,
                    })?;
                values.push(normalize_header_value(value));
            }
            headers.push((name.as_str(), values.join(",")));
        }
        headers.sort_by(|(a, _), (b, _)| a.cmp(b));
        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");
        Ok(CanonicalRequest {
            method: request.method(),
            path: canonical_path(request.uri()),
            params: canonical_params(request.uri()),
            headers,
            signed_headers,
            payload_hash,
        })
    }
}

impl fmt::Display for CanonicalRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.params)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}:{}", name, value)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers)?;
        write!(f, "{}", self.payload_hash)
    }
}

/// Trims the value and collapses runs of whitespace into a single space
fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn uri_encode(value: &str) -> Cow<'_, str> {
    utf8_percent_encode(value, URI_ENCODE_SET).into()
}

fn canonical_path(uri: &Uri) -> String {
    let path = uri.path();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| uri_encode(&percent_decode_str(segment).decode_utf8_lossy()).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_params(uri: &Uri) -> String {
    let query = match uri.query() {
        Some(query) => query,
        None => return String::new(),
    };
    let mut params: Vec<(Cow<'_, str>, Cow<'_, str>)> =
        form_urlencoded::parse(query.as_bytes()).collect();
    // Sort by param name, and then by param value
    params.sort();
    params
        .iter()
        .map(|(key, value)| format!("{}={}", uri_encode(key), uri_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::{canonical_params, canonical_path, sign_request, SigningParams, SigningSettings};
    use http::{Request, Uri};
    use pretty_assertions::assert_eq;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    // 2015-08-30T12:36:00Z
    fn test_time() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1440938160)
    }

    fn test_params(settings: SigningSettings) -> SigningParams<'static> {
        SigningParams {
            access_key: "AKIDEXAMPLE",
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            security_token: None,
            region: "us-east-1",
            service_name: "service",
            time: test_time(),
            settings,
        }
    }

    #[test]
    fn get_vanilla() {
        let mut request = Request::get("https://example.amazonaws.com/")
            .body(Vec::<u8>::new())
            .unwrap();
        sign_request(&mut request, &test_params(SigningSettings::default())).unwrap();
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(request.headers()["x-amz-date"], "20150830T123600Z");
        assert_eq!(request.headers()["host"], "example.amazonaws.com");
    }

    #[test]
    fn sts_form_post_with_session_token() {
        let mut request = Request::post("http://127.0.0.1:9000/")
            .header(
                "content-type",
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .body(b"Action=AssumeRole&Version=2011-06-15&DurationSeconds=3600".to_vec())
            .unwrap();
        let mut params = test_params(SigningSettings::default().with_content_sha256_header(true));
        params.service_name = "sts";
        params.security_token = Some("session-token");
        sign_request(&mut request, &params).unwrap();

        let headers = request.headers();
        assert_eq!(headers["host"], "127.0.0.1:9000");
        assert_eq!(headers["x-amz-security-token"], "session-token");
        assert_eq!(
            headers["x-amz-content-sha256"],
            "8a375e65d526ee94c21fa39887bbd0f0a1a0546f383e9d3e06cb75a3ad3f34f9"
        );
        assert_eq!(
            headers["authorization"].to_str().unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/sts/aws4_request, \
             SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date;x-amz-security-token, \
             Signature=56377409bb329210a4c481c32f5e9655abb26dc684659719df3bd97ecbd9925a"
        );
    }

    #[test]
    fn canonical_path_encodes_segments_once() {
        let uri: Uri = "http://host/openim/minio%20sts/a~b".parse().unwrap();
        assert_eq!(canonical_path(&uri), "/openim/minio%20sts/a~b");
        let uri: Uri = "http://host".parse().unwrap();
        assert_eq!(canonical_path(&uri), "/");
    }

    #[test]
    fn canonical_params_are_sorted_and_encoded() {
        let uri: Uri = "http://host/?b=2&a=z&a=y&c=hello%20world".parse().unwrap();
        assert_eq!(canonical_params(&uri), "a=y&a=z&b=2&c=hello%20world");
    }
}
