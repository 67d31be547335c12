/// オブジェクトストア（S3）へのアクセス
///
/// 一覧・取得・保存・削除・コピーと署名付きURLの発行を抽象化する。
/// ハンドラーはこのトレイト越しにS3を操作し、テストではインメモリのモックを使う。
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ObjectListing, ObjectSummary};
use crate::infrastructure::config::BucketConfig;

/// DeleteObjectsで一度に削除できる最大件数
const DELETE_BATCH_SIZE: usize = 1000;

/// JSONオブジェクトのContent-Type
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// オブジェクトストア操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObjectStoreError {
    /// 指定キーのオブジェクトが存在しない
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Write error: {0}")]
    WriteError(String),

    /// 署名付きURLの生成に失敗
    #[error("Presign error: {0}")]
    PresignError(String),

    /// オブジェクト本文のシリアライズ/デシリアライズに失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// オブジェクトストア操作用トレイト
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// プレフィックス配下を一覧する
    ///
    /// `delimited`がtrueの場合は直下のみ（サブフォルダは`prefixes`に入る）、
    /// falseの場合は配下の全オブジェクトを返す。
    async fn list(&self, prefix: &str, delimited: bool) -> Result<ObjectListing, ObjectStoreError>;

    /// オブジェクトをUTF-8テキストとして取得
    async fn get_text(&self, key: &str) -> Result<String, ObjectStoreError>;

    /// オブジェクトを保存（上書き）
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str)
    -> Result<(), ObjectStoreError>;

    /// オブジェクトを削除（存在しなくても成功）
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// 複数オブジェクトを削除
    async fn delete_many(&self, keys: &[String]) -> Result<(), ObjectStoreError>;

    /// 同一バケット内でコピー
    async fn copy(&self, from_key: &str, to_key: &str) -> Result<(), ObjectStoreError>;

    /// アップロード用の署名付きURL（PUT）
    async fn presign_put(&self, key: &str, content_type: &str) -> Result<String, ObjectStoreError>;

    /// ダウンロード用の署名付きURL（GET）
    async fn presign_get(&self, key: &str) -> Result<String, ObjectStoreError>;

    /// 公開オブジェクトURL
    fn public_url(&self, key: &str) -> String;
}

/// JSONオブジェクトを読み込んでデシリアライズ
pub async fn read_json<S, T>(store: &S, key: &str) -> Result<T, ObjectStoreError>
where
    S: ObjectStore + ?Sized,
    T: DeserializeOwned,
{
    let text = store.get_text(key).await?;
    serde_json::from_str(&text)
        .map_err(|e| ObjectStoreError::SerializationError(format!("{key}: {e}")))
}

/// 値をJSONとして保存
pub async fn write_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), ObjectStoreError>
where
    S: ObjectStore + ?Sized,
    T: Serialize + Sync,
{
    let body = serde_json::to_vec(value)
        .map_err(|e| ObjectStoreError::SerializationError(format!("{key}: {e}")))?;
    store.put(key, body, JSON_CONTENT_TYPE).await
}

/// プレフィックス配下の全キー
pub async fn list_all_keys<S>(store: &S, prefix: &str) -> Result<Vec<String>, ObjectStoreError>
where
    S: ObjectStore + ?Sized,
{
    let listing = store.list(prefix, false).await?;
    Ok(listing.objects.into_iter().map(|o| o.key).collect())
}

/// CopySource用にキーをパーセントエンコード（`/`は区切りとして残す）
fn encode_copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{bucket}/{}", encoded.join("/"))
}

/// ObjectStoreのS3実装
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    config: BucketConfig,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, config: BucketConfig) -> Self {
        Self { client, config }
    }

    fn presigning_config(&self) -> Result<PresigningConfig, ObjectStoreError> {
        PresigningConfig::expires_in(self.config.presign_expiry())
            .map_err(|e| ObjectStoreError::PresignError(e.to_string()))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self, prefix: &str, delimited: bool) -> Result<ObjectListing, ObjectStoreError> {
        let mut listing = ObjectListing::default();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(self.config.bucket())
                .prefix(prefix)
                .set_continuation_token(continuation_token.take());
            if delimited {
                request = request.delimiter("/");
            }

            let output = request
                .send()
                .await
                .map_err(|e| ObjectStoreError::ReadError(e.to_string()))?;

            listing.prefixes.extend(
                output
                    .common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix().map(str::to_string)),
            );
            listing
                .objects
                .extend(output.contents().iter().filter_map(|object| {
                    Some(ObjectSummary {
                        key: object.key()?.to_string(),
                        size: object.size().unwrap_or(0),
                        last_modified: object
                            .last_modified()
                            .and_then(|t| t.fmt(DateTimeFormat::DateTime).ok()),
                    })
                }));

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(
            prefix = prefix,
            prefixes = listing.prefixes.len(),
            objects = listing.objects.len(),
            "オブジェクト一覧取得"
        );
        Ok(listing)
    }

    async fn get_text(&self, key: &str) -> Result<String, ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(self.config.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    ObjectStoreError::NotFound(key.to_string())
                } else {
                    ObjectStoreError::ReadError(e.to_string())
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::ReadError(e.to_string()))?
            .into_bytes();

        String::from_utf8(bytes.to_vec())
            .map_err(|e| ObjectStoreError::SerializationError(format!("{key}: {e}")))
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.client
            .put_object()
            .bucket(self.config.bucket())
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ObjectStoreError::WriteError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(self.config.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::WriteError(e.to_string()))?;

        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ObjectStoreError::WriteError(e.to_string()))?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| ObjectStoreError::WriteError(e.to_string()))?;

            let output = self
                .client
                .delete_objects()
                .bucket(self.config.bucket())
                .delete(delete)
                .send()
                .await
                .map_err(|e| ObjectStoreError::WriteError(e.to_string()))?;

            if let Some(failed) = output.errors().first() {
                return Err(ObjectStoreError::WriteError(format!(
                    "failed to delete {}: {}",
                    failed.key().unwrap_or_default(),
                    failed.message().unwrap_or_default()
                )));
            }
        }

        Ok(())
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .copy_object()
            .bucket(self.config.bucket())
            .copy_source(encode_copy_source(self.config.bucket(), from_key))
            .key(to_key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::WriteError(e.to_string()))?;

        Ok(())
    }

    async fn presign_put(&self, key: &str, content_type: &str) -> Result<String, ObjectStoreError> {
        let request = self
            .client
            .put_object()
            .bucket(self.config.bucket())
            .key(key)
            .content_type(content_type)
            .presigned(self.presigning_config()?)
            .await
            .map_err(|e| ObjectStoreError::PresignError(e.to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn presign_get(&self, key: &str) -> Result<String, ObjectStoreError> {
        let request = self
            .client
            .get_object()
            .bucket(self.config.bucket())
            .key(key)
            .presigned(self.presigning_config()?)
            .await
            .map_err(|e| ObjectStoreError::PresignError(e.to_string()))?;

        Ok(request.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }
}
