/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::time::SystemTime;
use time::OffsetDateTime;

/// Formats a timestamp as `YYYYMMDD`
pub(crate) fn format_date(time: SystemTime) -> String {
    let time = OffsetDateTime::from(time);
    format!(
        "{:04}{:02}{:02}",
        time.year(),
        u8::from(time.month()),
        time.day()
    )
}

/// Formats a timestamp as `YYYYMMDD'T'HHMMSS'Z'`
pub(crate) fn format_date_time(time: SystemTime) -> String {
    let time = OffsetDateTime::from(time);
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        time.year(),
        u8::from(time.month()),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}

#[cfg(test)]
mod test {
    use super::{format_date, format_date_time};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn date_formats() {
        // 2015-08-30T12:36:00Z
        let time = UNIX_EPOCH + Duration::from_secs(1440938160);
        assert_eq!(format_date(time), "20150830");
        assert_eq!(format_date_time(time), "20150830T123600Z");
    }

    #[test]
    fn pads_single_digits() {
        // 2001-02-03T04:05:06Z
        let time = UNIX_EPOCH + Duration::from_secs(981173106);
        assert_eq!(format_date_time(time), "20010203T040506Z");
    }
}
