// 受講登録レコード
//
// 受講登録テーブル: パーティションキー`course_id`、ソートキー`student_id`。
// 受講生側からの一覧にはGSI`student_id-index`を使う。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::timestamp::format_timestamp;

/// 受講生IDで引くGSI名（受講登録テーブル・課題テーブル共通）
pub const STUDENT_INDEX_NAME: &str = "student_id-index";

/// 受講登録の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    /// 承認待ち
    #[default]
    Pending,
    /// 受講中
    Active,
    /// 修了
    Completed,
    /// 取り消し
    Dropped,
}

/// 受講登録
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub course_id: String,
    pub student_id: String,
    #[serde(default)]
    pub status: EnrollmentStatus,
    pub enrolled_at: String,
    pub updated_at: String,
}

impl EnrollmentRecord {
    /// 承認待ちの受講登録を作成
    ///
    /// `enrolled_at`が指定されない場合は現在時刻を使う。
    pub fn new(
        course_id: String,
        student_id: String,
        enrolled_at: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let timestamp = format_timestamp(now);
        Self {
            course_id,
            student_id,
            status: EnrollmentStatus::Pending,
            enrolled_at: enrolled_at.unwrap_or_else(|| timestamp.clone()),
            updated_at: timestamp,
        }
    }

    /// 課題配布の対象かどうか
    pub fn receives_assignments(&self) -> bool {
        self.status != EnrollmentStatus::Dropped
    }
}
