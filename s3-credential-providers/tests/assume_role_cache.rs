/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use s3_credential_cache::CredentialsCache;
use s3_credential_providers::sts::AssumeRoleProvider;
use s3_credential_providers::test_connection::{TestConnection, UnreachableConnection};
use s3_credential_types::time_source::{SharedTimeSource, TestingTimeSource};
use s3_credential_types::CredentialsError;

// 2015-08-30T12:36:00Z
const NOW: u64 = 1440938160;

fn assume_role_response(access_key_id: &str, expiration: &str) -> http::Response<String> {
    http::Response::builder()
        .status(200)
        .body(format!(
            r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>{}</AccessKeyId>
      <SecretAccessKey>secret</SecretAccessKey>
      <SessionToken>token</SessionToken>
      <Expiration>{}</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#,
            access_key_id, expiration
        ))
        .unwrap()
}

fn cache_with(conn: TestConnection, time: &TestingTimeSource) -> CredentialsCache {
    let provider = AssumeRoleProvider::builder()
        .endpoint("http://localhost:9000")
        .access_key("minio")
        .secret_key("minio123")
        .duration_seconds(3600)
        .connector(conn)
        .time_source(time.clone())
        .build()
        .expect("valid config");
    CredentialsCache::builder()
        .time_source(SharedTimeSource::new(time.clone()))
        .build(provider)
}

#[test_log::test(tokio::test)]
async fn unreachable_endpoint_caches_nothing() {
    let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(NOW));
    let provider = AssumeRoleProvider::builder()
        .endpoint("http://localhost:9000")
        .access_key("minio")
        .secret_key("minio123")
        .duration_seconds(3600)
        .connector(UnreachableConnection)
        .time_source(time.clone())
        .build()
        .expect("valid config");
    let cache = CredentialsCache::builder()
        .time_source(SharedTimeSource::new(time))
        .build(provider);

    for _ in 0..2 {
        let err = cache.get().await.expect_err("nothing is listening");
        assert!(err.is_transport_error(), "{:?}", err);
        assert!(cache.is_expired());
    }
}

#[test_log::test(tokio::test)]
async fn unreachable_real_endpoint() {
    // nothing listens on the discard port; depending on the host the connection is refused
    // or never answered, and both are transport failures
    let provider = AssumeRoleProvider::builder()
        .endpoint("http://127.0.0.1:9")
        .access_key("minio")
        .secret_key("minio123")
        .duration_seconds(3600)
        .timeout(Duration::from_secs(2))
        .build()
        .expect("valid config");
    let cache = CredentialsCache::new(provider);
    let err = cache.get().await.expect_err("nothing is listening");
    assert!(err.is_transport_error(), "{:?}", err);
    assert!(cache.is_expired());
}

#[test_log::test(tokio::test)]
async fn second_get_is_served_from_cache() {
    let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(NOW));
    let conn = TestConnection::new(vec![assume_role_response(
        "ASIAFIRST",
        "2015-08-30T13:36:00Z",
    )]);
    let cache = cache_with(conn.clone(), &time);

    let first = cache.get().await.expect("valid response");
    assert_eq!(first.access_key_id(), "ASIAFIRST");
    assert!(!cache.is_expired());
    let second = cache.get().await.expect("cached");
    assert_eq!(first, second);
    assert_eq!(conn.requests().len(), 1);
}

#[test_log::test(tokio::test)]
async fn credentials_inside_the_margin_are_never_served() {
    let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(NOW));
    let conn = TestConnection::new(vec![
        // five seconds left, inside the ten second margin
        assume_role_response("ASIASHORT", "2015-08-30T12:36:05Z"),
        assume_role_response("ASIALONG", "2015-08-30T13:36:00Z"),
    ]);
    let cache = cache_with(conn.clone(), &time);

    let err = cache.get().await.expect_err("credentials are about to expire");
    assert!(
        matches!(
            err,
            CredentialsError::CredentialsExpired { expiration }
                if expiration == UNIX_EPOCH + Duration::from_secs(NOW + 5)
        ),
        "{:?}",
        err
    );
    assert!(cache.is_expired());

    assert_eq!(cache.get().await.unwrap().access_key_id(), "ASIALONG");
    assert_eq!(conn.requests().len(), 2);
}

#[test_log::test(tokio::test)]
async fn refreshes_once_the_margin_is_reached() {
    let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(NOW));
    let conn = TestConnection::new(vec![
        assume_role_response("ASIAFIRST", "2015-08-30T13:36:00Z"),
        assume_role_response("ASIASECOND", "2015-08-30T14:36:00Z"),
    ]);
    let cache = cache_with(conn.clone(), &time);

    assert_eq!(cache.get().await.unwrap().access_key_id(), "ASIAFIRST");
    time.advance(Duration::from_secs(3589));
    assert_eq!(cache.get().await.unwrap().access_key_id(), "ASIAFIRST");
    time.advance(Duration::from_secs(1));
    assert!(cache.is_expired());
    assert_eq!(cache.get().await.unwrap().access_key_id(), "ASIASECOND");
    assert_eq!(conn.requests().len(), 2);
}

#[test_log::test(tokio::test)]
async fn expire_forces_a_new_exchange() {
    let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(NOW));
    let conn = TestConnection::new(vec![
        assume_role_response("ASIAFIRST", "2015-08-30T13:36:00Z"),
        assume_role_response("ASIASECOND", "2015-08-30T13:36:00Z"),
    ]);
    let cache = cache_with(conn.clone(), &time);

    assert_eq!(cache.get().await.unwrap().access_key_id(), "ASIAFIRST");
    cache.expire();
    assert!(cache.is_expired());
    assert_eq!(cache.get().await.unwrap().access_key_id(), "ASIASECOND");
    assert_eq!(conn.requests().len(), 2);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_callers_share_one_exchange() {
    let time = TestingTimeSource::new(UNIX_EPOCH + Duration::from_secs(NOW));
    let conn = TestConnection::new(vec![assume_role_response(
        "ASIAFIRST",
        "2015-08-30T13:36:00Z",
    )]);
    let cache = Arc::new(cache_with(conn.clone(), &time));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await })
        })
        .collect();
    for task in tasks {
        let creds = task.await.expect("task").expect("credentials");
        assert_eq!(creds.access_key_id(), "ASIAFIRST");
    }
    assert_eq!(conn.requests().len(), 1);
}
