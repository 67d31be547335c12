// 課題・試験の提出と採点
//
// 課題テーブル: パーティションキー`course_id`、ソートキー`student_item`
// （`<student_id>#<item_id>`）。受講生ごとの一覧はGSI`student_id-index`を使う。
// 1レコード = 1受講生 × 1課題。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::timestamp::{format_timestamp, parse_timestamp};

/// 満点の既定値
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

/// 課題操作のエラー
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssignmentError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("due date must be an RFC 3339 timestamp: {0}")]
    InvalidDueDate(String),

    #[error("max score must be greater than 0")]
    InvalidMaxScore,

    #[error("score {score} is out of range 0..={max}")]
    ScoreOutOfRange { score: f64, max: f64 },

    #[error("graded items cannot be resubmitted")]
    AlreadyGraded,
}

/// 項目の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Assignment,
    Exam,
    Quiz,
}

/// 提出状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Submitted,
    Graded,
}

/// 受講生向け一覧での分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentBucket {
    Pending,
    Overdue,
    Completed,
}

/// 提出ファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionFile {
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_type: String,
    pub file_key: String,
    #[serde(default)]
    pub upload_date: String,
}

/// 課題レコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub course_id: String,
    /// ソートキー（`<student_id>#<item_id>`）
    pub student_item: String,
    pub student_id: String,
    pub item_id: String,
    pub item_type: ItemType,
    pub item_name: String,
    pub due_date: String,
    pub max_score: f64,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_comment: Option<String>,
    #[serde(default)]
    pub files: Vec<SubmissionFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// 課題配布リクエスト
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub item_name: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub due_date: String,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
}

fn default_max_score() -> f64 {
    DEFAULT_MAX_SCORE
}

impl NewAssignment {
    pub fn validate(&self) -> Result<(), AssignmentError> {
        if self.course_id.trim().is_empty() {
            return Err(AssignmentError::MissingField("courseId"));
        }
        if self.item_name.trim().is_empty() {
            return Err(AssignmentError::MissingField("itemName"));
        }
        if parse_timestamp(&self.due_date).is_none() {
            return Err(AssignmentError::InvalidDueDate(self.due_date.clone()));
        }
        if !(self.max_score.is_finite() && self.max_score > 0.0) {
            return Err(AssignmentError::InvalidMaxScore);
        }
        Ok(())
    }
}

/// ソートキーを組み立てる
pub fn student_item_key(student_id: &str, item_id: &str) -> String {
    format!("{student_id}#{item_id}")
}

impl AssignmentRecord {
    /// 1受講生分の未提出レコードを作成
    pub fn assign(
        item: &NewAssignment,
        item_id: &str,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let timestamp = format_timestamp(now);
        Self {
            course_id: item.course_id.clone(),
            student_item: student_item_key(student_id, item_id),
            student_id: student_id.to_string(),
            item_id: item_id.to_string(),
            item_type: item.item_type,
            item_name: item.item_name.clone(),
            due_date: item.due_date.clone(),
            max_score: item.max_score,
            status: AssignmentStatus::Pending,
            score: None,
            feedback: None,
            submission_date: None,
            submission_comment: None,
            files: Vec::new(),
            graded_by: None,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    /// 提出（再提出は上書き）
    pub fn submit(
        &mut self,
        comment: Option<String>,
        files: Vec<SubmissionFile>,
        now: DateTime<Utc>,
    ) -> Result<(), AssignmentError> {
        if self.status == AssignmentStatus::Graded {
            return Err(AssignmentError::AlreadyGraded);
        }
        let timestamp = format_timestamp(now);
        self.status = AssignmentStatus::Submitted;
        self.submission_date = Some(timestamp.clone());
        self.submission_comment = comment;
        self.files = files;
        self.updated_at = timestamp;
        Ok(())
    }

    /// 採点
    ///
    /// 未提出の項目（オフライン試験など）も採点できる。
    pub fn grade(
        &mut self,
        score: f64,
        feedback: Option<String>,
        graded_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AssignmentError> {
        if !score.is_finite() || score < 0.0 || score > self.max_score {
            return Err(AssignmentError::ScoreOutOfRange {
                score,
                max: self.max_score,
            });
        }
        self.status = AssignmentStatus::Graded;
        self.score = Some(score);
        self.feedback = feedback;
        self.graded_by = graded_by;
        self.updated_at = format_timestamp(now);
        Ok(())
    }

    pub fn has_submitted(&self) -> bool {
        self.submission_date.is_some()
    }

    /// 締切後に提出されたかどうか
    pub fn is_late(&self) -> bool {
        let due = parse_timestamp(&self.due_date);
        let submitted = self.submission_date.as_deref().and_then(parse_timestamp);
        matches!((due, submitted), (Some(due), Some(submitted)) if submitted > due)
    }

    /// 受講生向け一覧での分類
    pub fn bucket(&self, now: DateTime<Utc>) -> StudentBucket {
        match self.status {
            AssignmentStatus::Submitted | AssignmentStatus::Graded => StudentBucket::Completed,
            AssignmentStatus::Pending => match parse_timestamp(&self.due_date) {
                Some(due) if due < now => StudentBucket::Overdue,
                _ => StudentBucket::Pending,
            },
        }
    }
}

/// 分類別の一覧
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AssignmentBuckets {
    pub pending: Vec<AssignmentRecord>,
    pub overdue: Vec<AssignmentRecord>,
    pub completed: Vec<AssignmentRecord>,
    pub total: usize,
}

impl AssignmentBuckets {
    fn push(&mut self, record: AssignmentRecord, now: DateTime<Utc>) {
        match record.bucket(now) {
            StudentBucket::Pending => self.pending.push(record),
            StudentBucket::Overdue => self.overdue.push(record),
            StudentBucket::Completed => self.completed.push(record),
        }
        self.total += 1;
    }
}

/// 受講生ダッシュボード用の一覧（小テストは試験側にまとめる）
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StudentAssignments {
    pub assignments: AssignmentBuckets,
    pub exams: AssignmentBuckets,
}

/// 受講生の課題を種類・分類別にまとめる
pub fn group_for_student(records: Vec<AssignmentRecord>, now: DateTime<Utc>) -> StudentAssignments {
    let mut grouped = StudentAssignments::default();
    for record in records {
        match record.item_type {
            ItemType::Assignment => grouped.assignments.push(record, now),
            ItemType::Exam | ItemType::Quiz => grouped.exams.push(record, now),
        }
    }
    grouped
}

/// 講義内の課題ごとの集計
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub item_id: String,
    pub item_type: ItemType,
    pub item_name: String,
    pub due_date: String,
    pub total_students: usize,
    pub total_submissions: usize,
    pub completed_submissions: usize,
    pub average_score: f64,
    pub min_score: f64,
    pub max_score: f64,
}

/// 講義の課題レコードを課題ごとに集計する（締切の早い順）
///
/// スコアの統計は採点済みレコードのみを対象とし、採点済みがなければ0とする。
pub fn summarize_course(records: &[AssignmentRecord]) -> Vec<ItemSummary> {
    let mut by_item: BTreeMap<&str, Vec<&AssignmentRecord>> = BTreeMap::new();
    for record in records {
        by_item.entry(record.item_id.as_str()).or_default().push(record);
    }

    let mut summaries: Vec<ItemSummary> = by_item
        .into_iter()
        .filter_map(|(item_id, group)| {
            let first = group.first()?;
            let scores: Vec<f64> = group.iter().filter_map(|r| r.score).collect();
            let (average, min, max) = if scores.is_empty() {
                (0.0, 0.0, 0.0)
            } else {
                let sum: f64 = scores.iter().sum();
                (
                    sum / scores.len() as f64,
                    scores.iter().copied().fold(f64::INFINITY, f64::min),
                    scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                )
            };

            Some(ItemSummary {
                item_id: item_id.to_string(),
                item_type: first.item_type,
                item_name: first.item_name.clone(),
                due_date: first.due_date.clone(),
                total_students: group.len(),
                total_submissions: group.iter().filter(|r| r.has_submitted()).count(),
                completed_submissions: group
                    .iter()
                    .filter(|r| r.status == AssignmentStatus::Graded)
                    .count(),
                average_score: average,
                min_score: min,
                max_score: max,
            })
        })
        .collect();

    summaries.sort_by(|a, b| {
        parse_timestamp(&a.due_date)
            .cmp(&parse_timestamp(&b.due_date))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    summaries
}
