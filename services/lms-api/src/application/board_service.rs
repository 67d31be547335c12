// 掲示板共通の投稿操作
//
// お知らせ・コミュニティ・Q&Aはオブジェクトのレイアウトが違うだけで、
// 作成・一覧・閲覧・削除の流れは共通。

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::{ErrorContext, HandlerError};
use crate::application::request::Claims;
use crate::domain::post::sort_newest_first;
use crate::domain::timestamp::format_timestamp;
use crate::domain::{Attachment, BoardKind, NewPost, Post};
use crate::infrastructure::ObjectStore;
use crate::infrastructure::object_store::{ObjectStoreError, list_all_keys, read_json, write_json};

/// 添付ファイルのアップロード先
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    pub presigned_url: String,
    pub key: String,
}

/// 投稿作成の結果
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPost {
    pub post: Post,
    pub upload_urls: Vec<UploadUrl>,
}

/// 投稿者名を決める
///
/// ボディの`author`を優先し、なければクレームのname、email、subの順に使う。
pub fn post_author(input: &NewPost, claims: &Claims) -> String {
    input
        .author
        .clone()
        .filter(|a| !a.trim().is_empty())
        .or_else(|| claims.name.clone())
        .or_else(|| claims.email.clone())
        .or_else(|| claims.sub.clone())
        .unwrap_or_default()
}

/// 掲示板1つ分の投稿操作
pub struct BoardService<S> {
    store: S,
    kind: BoardKind,
}

impl<S: ObjectStore> BoardService<S> {
    pub fn new(store: S, kind: BoardKind) -> Self {
        Self { store, kind }
    }

    pub fn kind(&self) -> BoardKind {
        self.kind
    }

    fn not_found(&self) -> HandlerError {
        match self.kind {
            BoardKind::Notice => HandlerError::not_found("Notice not found"),
            BoardKind::Community | BoardKind::Qna => HandlerError::not_found("Post not found"),
        }
    }

    /// 投稿を作成し、添付ファイルごとに署名付きアップロードURLを発行する
    pub async fn create(&self, author: String, input: &NewPost) -> Result<CreatedPost, HandlerError> {
        let now = Utc::now();
        let post_id = Uuid::new_v4().to_string();
        let mut post = Post::create(post_id.clone(), author, input, self.kind.tracks_answers(), now)
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;

        let uploaded_at = format_timestamp(now);
        post.attachments = input
            .attachments
            .iter()
            .map(|request| {
                let file_id = Uuid::new_v4().to_string();
                let key = self
                    .kind
                    .attachment_key(&post_id, &file_id, &request.safe_name());
                Attachment {
                    id: file_id,
                    url: self.store.public_url(&key),
                    key,
                    name: request.name.clone(),
                    content_type: request.content_type.clone(),
                    size: request.size,
                    uploaded_at: uploaded_at.clone(),
                }
            })
            .collect();

        let presigned = join_all(
            post.attachments
                .iter()
                .map(|a| self.store.presign_put(&a.key, &a.content_type)),
        )
        .await;
        let upload_urls = post
            .attachments
            .iter()
            .zip(presigned)
            .map(|(attachment, url)| {
                Ok(UploadUrl {
                    presigned_url: url?,
                    key: attachment.key.clone(),
                })
            })
            .collect::<Result<Vec<_>, ObjectStoreError>>()
            .context("Failed to create upload URL")?;

        write_json(&self.store, &self.kind.metadata_key(&post_id), &post)
            .await
            .context("Failed to save post")?;

        info!(
            board = self.kind.root_prefix(),
            post_id = %post_id,
            attachments = post.attachments.len(),
            "投稿作成"
        );
        Ok(CreatedPost { post, upload_urls })
    }

    /// 全投稿を作成日時の新しい順に返す（読み込めない投稿は読み飛ばす）
    pub async fn list(&self) -> Result<Vec<Post>, HandlerError> {
        let listing = self
            .store
            .list(self.kind.root_prefix(), true)
            .await
            .context("Failed to list posts")?;
        let keys = self.kind.metadata_keys(&listing);

        let results = join_all(keys.iter().map(|key| read_json::<S, Post>(&self.store, key))).await;

        let mut posts: Vec<Post> = keys
            .iter()
            .zip(results)
            .filter_map(|(key, result)| match result {
                Ok(post) => Some(post),
                Err(err) => {
                    warn!(key = %key, error = %err, "投稿の読み込みに失敗");
                    None
                }
            })
            .collect();

        sort_newest_first(&mut posts);
        Ok(posts)
    }

    /// 投稿を取得する（存在しない場合は`Ok(None)`）
    pub async fn find(&self, post_id: &str) -> Result<Option<Post>, HandlerError> {
        match read_json::<S, Post>(&self.store, &self.kind.metadata_key(post_id)).await {
            Ok(post) => Ok(Some(post)),
            Err(ObjectStoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(HandlerError::internal("Failed to get post", err)),
        }
    }

    /// 閲覧数を1増やして投稿を返す
    ///
    /// 読み込み → 加算 → 書き戻しの順で行うため、同時閲覧では加算が失われうる。
    pub async fn view(&self, post_id: &str) -> Result<Post, HandlerError> {
        let mut post = self.find(post_id).await?.ok_or_else(|| self.not_found())?;
        post.record_view();
        if self.kind.touches_on_view() {
            post.touch(Utc::now());
        }

        write_json(&self.store, &self.kind.metadata_key(post_id), &post)
            .await
            .context("Failed to update view count")?;
        Ok(post)
    }

    /// 投稿を上書き保存する
    pub async fn save(&self, post: &Post) -> Result<(), HandlerError> {
        write_json(&self.store, &self.kind.metadata_key(&post.metadata.id), post)
            .await
            .context("Failed to save post")
    }

    /// 投稿と添付ファイルを削除する
    pub async fn delete(&self, post_id: &str) -> Result<(), HandlerError> {
        let attachment_keys = list_all_keys(&self.store, &self.kind.attachment_prefix(post_id))
            .await
            .context("Failed to list attachments")?;
        if !attachment_keys.is_empty() {
            self.store
                .delete_many(&attachment_keys)
                .await
                .context("Failed to delete attachments")?;
        }

        self.store
            .delete(&self.kind.metadata_key(post_id))
            .await
            .context("Failed to delete post")?;

        info!(
            board = self.kind.root_prefix(),
            post_id = post_id,
            attachments = attachment_keys.len(),
            "投稿削除"
        );
        Ok(())
    }

    /// 存在を確認してから削除する
    pub async fn delete_existing(&self, post_id: &str) -> Result<(), HandlerError> {
        if self.find(post_id).await?.is_none() {
            return Err(self.not_found());
        }
        self.delete(post_id).await
    }
}
