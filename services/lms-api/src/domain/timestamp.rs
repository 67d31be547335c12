// タイムスタンプ表現
//
// 全レコードのタイムスタンプはミリ秒精度・UTC（`Z`接尾辞）のRFC 3339文字列で保存する。

use chrono::{DateTime, SecondsFormat, Utc};

/// 日時をレコード保存用の文字列に変換
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// レコードの日時文字列をパース
///
/// タイムゾーン付きのRFC 3339文字列であればUTCに正規化して返す。
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
