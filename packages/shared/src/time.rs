use chrono::{DateTime, Utc};

/// Wire format used for message timestamps (`YYYY-MM-DD HH:MM:SS`, UTC).
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current Unix timestamp in UTC (milliseconds)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a Unix timestamp (milliseconds) as `YYYY-MM-DD HH:MM:SS` in UTC.
///
/// Out-of-range values fall back to the Unix epoch.
pub fn format_wire_timestamp(millis: i64) -> String {
    to_datetime(millis).format(WIRE_TIMESTAMP_FORMAT).to_string()
}

fn to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_wire_timestamp() {
        // テスト項目: ミリ秒タイムスタンプが "YYYY-MM-DD HH:MM:SS" 形式に変換される
        // given (前提条件):
        let millis = 1_700_000_000_123;

        // when (操作):
        let formatted = format_wire_timestamp(millis);

        // then (期待する結果):
        assert_eq!(formatted, "2023-11-14 22:13:20");
    }

    #[test]
    fn test_out_of_range_falls_back_to_epoch() {
        // テスト項目: 範囲外の値はエポックとして整形される
        // when (操作):
        let formatted = format_wire_timestamp(i64::MAX);

        // then (期待する結果):
        assert_eq!(formatted, "1970-01-01 00:00:00");
    }

    #[test]
    fn test_now_millis_is_recent() {
        // テスト項目: 現在時刻が 2023 年以降のミリ秒で返される
        // then (期待する結果):
        assert!(now_millis() > 1_672_531_200_000);
    }
}
