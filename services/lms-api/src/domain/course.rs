// 講義レコードとオブジェクトストア上の講義フォルダ構成
//
// 講義メタデータは講義テーブル（パーティションキー`id`）とS3の`meta.json`の
// 両方に保存される。S3側のフォルダは
// `<mainCategory>/<subCategory>/courses/<id>/` 配下に週別フォルダを持つ。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::timestamp::format_timestamp;

/// 講義あたりの週数
pub const WEEK_COUNT: u32 = 16;

/// 講義・週フォルダのメタデータファイル名
pub const META_FILE_NAME: &str = "meta.json";

/// 講義テーブルのGSI名（パーティションキー`mainCategory`、ソートキー`createdAt`）
pub const CATEGORY_INDEX_NAME: &str = "mainCategory-createdAt-index";

/// 講義IDのランダム部分の長さ
const COURSE_ID_SUFFIX_LENGTH: usize = 13;

/// 講義レコードの検証エラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CourseValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    /// カテゴリ名に`/`を含むとフォルダ構成が崩れる
    #[error("{0} must not contain '/'")]
    InvalidPathSegment(&'static str),

    #[error("at least one field must be provided")]
    EmptyUpdate,
}

/// 講義の公開状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// 講義の難易度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// 担当講師の参照
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstructorRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// 講義レコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub main_category: String,
    pub sub_category: String,
    #[serde(default)]
    pub instructor: InstructorRef,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    pub created_at: String,
    pub updated_at: String,
}

/// 講義作成リクエスト
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub main_category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub instructor: InstructorRef,
    #[serde(default)]
    pub status: Option<CourseStatus>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub level: Option<CourseLevel>,
}

impl NewCourse {
    /// 必須項目とカテゴリ名を検証
    pub fn validate(&self) -> Result<(), CourseValidationError> {
        if self.title.trim().is_empty() {
            return Err(CourseValidationError::MissingField("title"));
        }
        validate_category("mainCategory", &self.main_category)?;
        validate_category("subCategory", &self.sub_category)?;
        Ok(())
    }
}

/// 講義更新リクエスト
///
/// 指定されたフィールドのみ上書きする。カテゴリの変更はフォルダ移動を伴うため
/// ここでは受け付けない（管理者の講義移動APIを使用する）。
/// シリアライズ時は`None`のフィールドを出力しないため、そのまま更新式の材料になる。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<InstructorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
}

impl CourseUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.instructor.is_none()
            && self.status.is_none()
            && self.thumbnail.is_none()
            && self.price.is_none()
            && self.level.is_none()
    }

    pub fn validate(&self) -> Result<(), CourseValidationError> {
        if self.is_empty() {
            return Err(CourseValidationError::EmptyUpdate);
        }
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(CourseValidationError::MissingField("title"));
        }
        Ok(())
    }
}

/// 週フォルダのメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekMeta {
    pub title: String,
    pub description: String,
    pub status: String,
}

impl CourseRecord {
    /// 作成リクエストから新しい講義レコードを生成
    pub fn create(
        input: NewCourse,
        id: String,
        now: DateTime<Utc>,
    ) -> Result<Self, CourseValidationError> {
        input.validate()?;
        let timestamp = format_timestamp(now);

        Ok(Self {
            id,
            title: input.title,
            description: input.description,
            main_category: input.main_category,
            sub_category: input.sub_category,
            instructor: input.instructor,
            status: input.status.unwrap_or_default(),
            thumbnail: input.thumbnail,
            price: input.price,
            level: input.level,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        })
    }

    /// オブジェクトストア上の講義フォルダパス（末尾スラッシュなし）
    pub fn course_path(&self) -> String {
        course_path(&self.main_category, &self.sub_category, &self.id)
    }

    /// 更新内容を適用（テーブル側の更新式と同じ結果になる）
    pub fn apply_update(&mut self, update: &CourseUpdate, now: DateTime<Utc>) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(instructor) = &update.instructor {
            self.instructor = instructor.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(thumbnail) = &update.thumbnail {
            self.thumbnail = Some(thumbnail.clone());
        }
        if let Some(price) = update.price {
            self.price = Some(price);
        }
        if let Some(level) = update.level {
            self.level = Some(level);
        }
        self.updated_at = format_timestamp(now);
    }
}

fn validate_category(field: &'static str, value: &str) -> Result<(), CourseValidationError> {
    if value.trim().is_empty() {
        return Err(CourseValidationError::MissingField(field));
    }
    if value.contains('/') {
        return Err(CourseValidationError::InvalidPathSegment(field));
    }
    Ok(())
}

/// 講義フォルダパスを組み立てる
pub fn course_path(main_category: &str, sub_category: &str, course_id: &str) -> String {
    format!("{main_category}/{sub_category}/courses/{course_id}")
}

/// カテゴリ配下の講義フォルダを列挙するためのプレフィックス
pub fn courses_prefix(main_category: &str, sub_category: &str) -> String {
    format!("{main_category}/{sub_category}/courses/")
}

/// 講義ID（`<unixミリ秒>-<英数字13文字>`）を生成
pub fn generate_course_id(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}",
        now.timestamp_millis(),
        &random[..COURSE_ID_SUFFIX_LENGTH]
    )
}

/// 週フォルダのキー（`<course_path>/<n>주차/`）
pub fn week_folder_key(course_path: &str, week: u32) -> String {
    format!("{course_path}/{week}주차/")
}

/// 週フォルダのメタデータ初期値
pub fn week_meta(week: u32) -> WeekMeta {
    WeekMeta {
        title: format!("{week}주차"),
        description: String::new(),
        status: "SCHEDULED".to_string(),
    }
}
