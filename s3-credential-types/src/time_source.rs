/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Time sources
//!
//! Every clock read made while deciding whether credentials are expired goes through a
//! [`TimeSource`] so that tests can move time explicitly.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::SystemTime;

/// Trait with a `now()` function returning the current time
pub trait TimeSource: Debug + Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Time source that delegates to [`SystemTime::now`]
#[non_exhaustive]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Time source that can be shared across threads
#[derive(Debug, Clone)]
pub struct SharedTimeSource(Arc<dyn TimeSource>);

impl SharedTimeSource {
    pub fn new(source: impl TimeSource + 'static) -> Self {
        SharedTimeSource(Arc::new(source))
    }

    pub fn now(&self) -> SystemTime {
        self.0.now()
    }
}

impl Default for SharedTimeSource {
    fn default() -> Self {
        SharedTimeSource::new(SystemTimeSource)
    }
}

impl TimeSource for SharedTimeSource {
    fn now(&self) -> SystemTime {
        self.0.now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use testing::TestingTimeSource;

#[cfg(any(test, feature = "test-util"))]
mod testing {
    use super::TimeSource;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime};

    /// Time source that can be manually moved for tests
    ///
    /// # Examples
    ///
    /// ```rust
    /// use s3_credential_types::time_source::{TestingTimeSource, TimeSource};
    /// use std::time::{Duration, UNIX_EPOCH};
    ///
    /// let time = TestingTimeSource::new(UNIX_EPOCH);
    /// time.advance(Duration::from_secs(100));
    /// assert_eq!(time.now(), UNIX_EPOCH + Duration::from_secs(100));
    /// ```
    #[derive(Clone, Debug)]
    pub struct TestingTimeSource {
        now: Arc<Mutex<SystemTime>>,
    }

    impl TestingTimeSource {
        pub fn new(start_time: SystemTime) -> Self {
            Self {
                now: Arc::new(Mutex::new(start_time)),
            }
        }

        pub fn set_time(&self, time: SystemTime) {
            *self.now.lock().unwrap() = time;
        }

        pub fn advance(&self, delta: Duration) {
            *self.now.lock().unwrap() += delta;
        }
    }

    impl TimeSource for TestingTimeSource {
        fn now(&self) -> SystemTime {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod test {
    use super::{SharedTimeSource, TestingTimeSource, TimeSource};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn testing_time_source_should_behave_as_expected() {
        let time_source = TestingTimeSource::new(UNIX_EPOCH);
        let shared = SharedTimeSource::new(time_source.clone());
        assert_eq!(shared.now(), UNIX_EPOCH);
        time_source.advance(Duration::from_secs(10));
        assert_eq!(shared.now(), UNIX_EPOCH + Duration::from_secs(10));
        time_source.set_time(UNIX_EPOCH);
        assert_eq!(time_source.now(), UNIX_EPOCH);
    }
}
