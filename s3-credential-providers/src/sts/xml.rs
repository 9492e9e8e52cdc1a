/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Decoders for the XML documents returned by `AssumeRole`

use std::time::SystemTime;

use aws_smithy_xml::decode::{try_data, Document, ScopedDecoder};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub(crate) enum XmlDecodeError {
    #[error("invalid XML")]
    InvalidXml(#[from] aws_smithy_xml::decode::XmlDecodeError),
    #[error("unexpected root element `{0}`")]
    UnexpectedRoot(String),
    #[error("missing `{0}`")]
    MissingField(&'static str),
    #[error("invalid expiration timestamp `{value}`")]
    InvalidExpiration {
        value: String,
        source: time::error::Parse,
    },
}

/// Credentials issued by a successful `AssumeRole` call
#[derive(Debug, PartialEq)]
pub(crate) struct AssumedCredentials {
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) session_token: String,
    pub(crate) expiration: SystemTime,
}

/// Error details from an STS `ErrorResponse` document
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct StsError {
    pub(crate) code: Option<String>,
    pub(crate) message: Option<String>,
}

pub(crate) fn parse_assume_role_response(
    body: &str,
) -> Result<AssumedCredentials, XmlDecodeError> {
    let mut document = Document::new(body);
    let mut root = document.root_element()?;
    if !root.start_el().matches("AssumeRoleResponse") {
        return Err(XmlDecodeError::UnexpectedRoot(
            root.start_el().local().to_string(),
        ));
    }
    let mut credentials = None;
    while let Some(mut result) = root.next_tag() {
        if !result.start_el().matches("AssumeRoleResult") {
            continue;
        }
        while let Some(mut tag) = result.next_tag() {
            match tag.start_el() {
                s if s.matches("Credentials") => {
                    credentials = Some(de_credentials(&mut tag)?);
                }
                _ => {}
            }
        }
    }
    credentials.ok_or(XmlDecodeError::MissingField("Credentials"))
}

fn de_credentials(
    decoder: &mut ScopedDecoder<'_, '_>,
) -> Result<AssumedCredentials, XmlDecodeError> {
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;
    let mut expiration = None;
    while let Some(mut tag) = decoder.next_tag() {
        match tag.start_el() {
            s if s.matches("AccessKeyId") => access_key_id = Some(text(&mut tag)?),
            s if s.matches("SecretAccessKey") => secret_access_key = Some(text(&mut tag)?),
            s if s.matches("SessionToken") => session_token = Some(text(&mut tag)?),
            s if s.matches("Expiration") => expiration = Some(text(&mut tag)?),
            _ => {}
        }
    }
    let expiration = expiration.ok_or(XmlDecodeError::MissingField("Expiration"))?;
    let expiration: SystemTime = OffsetDateTime::parse(&expiration, &Rfc3339)
        .map_err(|source| XmlDecodeError::InvalidExpiration {
            value: expiration.clone(),
            source,
        })?
        .into();
    Ok(AssumedCredentials {
        access_key_id: access_key_id.ok_or(XmlDecodeError::MissingField("AccessKeyId"))?,
        secret_access_key: secret_access_key
            .ok_or(XmlDecodeError::MissingField("SecretAccessKey"))?,
        session_token: session_token.ok_or(XmlDecodeError::MissingField("SessionToken"))?,
        expiration,
    })
}

/// Returns `None` when `body` is not an STS `ErrorResponse`
pub(crate) fn parse_error_response(body: &str) -> Option<StsError> {
    let mut document = Document::new(body);
    let mut root = document.root_element().ok()?;
    if !root.start_el().matches("ErrorResponse") {
        return None;
    }
    let mut error = StsError {
        code: None,
        message: None,
    };
    while let Some(mut tag) = root.next_tag() {
        if !tag.start_el().matches("Error") {
            continue;
        }
        while let Some(mut field) = tag.next_tag() {
            match field.start_el() {
                s if s.matches("Code") => error.code = text(&mut field).ok(),
                s if s.matches("Message") => error.message = text(&mut field).ok(),
                _ => {}
            }
        }
    }
    Some(error)
}

fn text(tag: &mut ScopedDecoder<'_, '_>) -> Result<String, XmlDecodeError> {
    Ok(try_data(tag)?.trim().to_string())
}
