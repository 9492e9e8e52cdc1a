/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Expiry policy
//!
//! Credentials are considered expired a fixed margin before their real expiration. The time
//! between deciding that credentials are valid and a signed request reaching the server is not
//! zero, and the margin keeps credentials from expiring in that window.

use crate::time_source::SharedTimeSource;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::trace;

/// Margin applied when no other margin is configured
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// Returns whether `expiration` is effectively expired at `now` given a safety `margin`.
///
/// An expiration at or before `now + margin` is expired.
pub fn is_expired(expiration: SystemTime, margin: Duration, now: SystemTime) -> bool {
    match expiration.checked_sub(margin) {
        Some(cutoff) => now >= cutoff,
        None => true,
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum State {
    /// Nothing has been retrieved yet
    Unset,
    Never,
    At(SystemTime),
}

/// Tracks the expiration of the last credentials a provider returned
#[derive(Debug)]
pub struct Expiry {
    state: Mutex<State>,
    margin: Duration,
    time_source: SharedTimeSource,
}

impl Expiry {
    /// Tracker using [`DEFAULT_EXPIRY_MARGIN`]
    pub fn new(time_source: SharedTimeSource) -> Self {
        Self::with_margin(time_source, DEFAULT_EXPIRY_MARGIN)
    }

    pub fn with_margin(time_source: SharedTimeSource, margin: Duration) -> Self {
        Expiry {
            state: Mutex::new(State::Unset),
            margin,
            time_source,
        }
    }

    /// Records the expiration of freshly retrieved credentials. `None` means they never expire.
    pub fn set(&self, expiration: Option<SystemTime>) {
        trace!(expiration = ?expiration, "recording credentials expiration");
        *self.lock() = match expiration {
            Some(at) => State::At(at),
            None => State::Never,
        };
    }

    pub fn set_expiration(&self, expiration: SystemTime) {
        self.set(Some(expiration))
    }

    pub fn is_expired(&self) -> bool {
        match *self.lock() {
            State::Unset => true,
            State::Never => false,
            State::At(at) => is_expired(at, self.margin, self.time_source.now()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // the guarded section never panics
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::{is_expired, Expiry, DEFAULT_EXPIRY_MARGIN};
    use crate::time_source::{SharedTimeSource, TestingTimeSource};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn epoch_secs(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn margin_boundaries() {
        let now = epoch_secs(1000);
        let margin = Duration::from_secs(10);
        assert!(is_expired(now + margin - Duration::from_secs(1), margin, now));
        assert!(is_expired(now + margin, margin, now));
        assert!(!is_expired(now + margin + Duration::from_secs(1), margin, now));
    }

    #[test]
    fn expiration_at_or_before_now_is_expired() {
        let now = epoch_secs(1000);
        assert!(is_expired(now, Duration::ZERO, now));
        assert!(is_expired(epoch_secs(10), Duration::ZERO, now));
        assert!(is_expired(UNIX_EPOCH, DEFAULT_EXPIRY_MARGIN, now));
    }

    #[test]
    fn tracker_is_expired_until_set() {
        let time = TestingTimeSource::new(epoch_secs(100));
        let expiry = Expiry::new(SharedTimeSource::new(time.clone()));
        assert!(expiry.is_expired());

        expiry.set_expiration(epoch_secs(200));
        assert!(!expiry.is_expired());

        time.set_time(epoch_secs(190));
        assert!(expiry.is_expired());

        expiry.set(None);
        assert!(!expiry.is_expired());
    }

    #[test]
    fn is_expired_is_idempotent() {
        let time = TestingTimeSource::new(epoch_secs(100));
        let expiry = Expiry::new(SharedTimeSource::new(time));
        expiry.set_expiration(epoch_secs(500));
        let first = expiry.is_expired();
        for _ in 0..5 {
            assert_eq!(expiry.is_expired(), first);
        }
    }
}
