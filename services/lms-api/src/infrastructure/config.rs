/// 環境変数からの設定読み込み
///
/// Lambdaのコールドスタート時に一度だけ読み込み、ハンドラー構築に使う。
use std::time::Duration;

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, SdkConfig};
use thiserror::Error;

/// 講義コンテンツ用バケット名
pub const BUCKET_NAME_VAR: &str = "BUCKET_NAME";
/// コミュニティ掲示板用バケット名
pub const COMMUNITY_BUCKET_NAME_VAR: &str = "COMMUNITY_BUCKET_NAME";
/// ユーザーテーブル名
pub const USER_TABLE_VAR: &str = "USER_TABLE_NAME";
/// 講義テーブル名
pub const COURSE_TABLE_VAR: &str = "COURSE_TABLE_NAME";
/// 受講登録テーブル名
pub const ENROLLMENT_TABLE_VAR: &str = "ENROLLMENT_TABLE_NAME";
/// 課題テーブル名
pub const ASSIGNMENT_TABLE_VAR: &str = "ASSIGNMENT_TABLE_NAME";

const REGION_VAR: &str = "AWS_REGION";
const PRESIGN_EXPIRY_VAR: &str = "PRESIGNED_URL_EXPIRES_SECONDS";

/// リージョン未設定時の既定値
pub const DEFAULT_REGION: &str = "ap-northeast-2";
/// 署名付きURLの既定の有効期限（秒）
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

/// 設定のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// 必須の環境変数を読み込む（空文字は未設定扱い）
pub fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// AWS SDK共通設定を読み込む
///
/// リージョンが環境から得られない場合は`DEFAULT_REGION`を使う。
pub async fn load_aws_config() -> SdkConfig {
    let region = RegionProviderChain::default_provider().or_else(DEFAULT_REGION);
    aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .load()
        .await
}

/// バケット設定
///
/// 公開URLの組み立てと署名付きURLの有効期限に使う値をまとめて持つ。
#[derive(Debug, Clone, PartialEq)]
pub struct BucketConfig {
    bucket: String,
    region: String,
    presign_expiry: Duration,
}

impl BucketConfig {
    /// 環境変数から作成
    ///
    /// 環境変数:
    /// - `bucket_var`: バケット名（必須）
    /// - AWS_REGION: 公開URL用リージョン（既定`ap-northeast-2`）
    /// - PRESIGNED_URL_EXPIRES_SECONDS: 署名付きURLの有効期限（既定3600）
    pub fn from_env(bucket_var: &str) -> Result<Self, ConfigError> {
        let bucket = required_env(bucket_var)?;
        let region = std::env::var(REGION_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let presign_expiry = match std::env::var(PRESIGN_EXPIRY_VAR) {
            Ok(value) => parse_expiry(&value)?,
            Err(_) => Duration::from_secs(DEFAULT_PRESIGN_EXPIRY_SECS),
        };

        Ok(Self {
            bucket,
            region,
            presign_expiry,
        })
    }

    /// 明示的な値で作成（テスト用）
    pub fn new(bucket: impl Into<String>, region: impl Into<String>, presign_expiry: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            presign_expiry,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn presign_expiry(&self) -> Duration {
        self.presign_expiry
    }

    /// 公開オブジェクトURL
    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.{}.amazonaws.com/{key}", self.bucket, self.region)
    }
}

fn parse_expiry(value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidValue {
            name: PRESIGN_EXPIRY_VAR.to_string(),
            value: value.to_string(),
        })
}
