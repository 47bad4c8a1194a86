//! 时间工具模块

use chrono::{DateTime, TimeZone, Utc};

/// 区块时间（秒）转毫秒；负值或溢出时为 0
pub fn seconds_to_millis(secs: i64) -> i64 {
    if secs < 0 {
        return 0;
    }
    secs.checked_mul(1000).unwrap_or(0)
}

/// 毫秒时间戳转 UTC 时间
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(seconds_to_millis(1_700_000_000), 1_700_000_000_000);
        assert_eq!(seconds_to_millis(-5), 0);
        assert_eq!(seconds_to_millis(i64::MAX), 0);
    }

    #[test]
    fn test_millis_to_datetime() {
        let dt = millis_to_datetime(1_700_000_000_000).unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }
}
