/// 掲示板の投稿（お知らせ・コミュニティ・Q&A共通）
///
/// 投稿はメタデータ・本文・添付ファイル一覧を1つのJSONとしてオブジェクトストアに保存する。
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::timestamp::{format_timestamp, parse_timestamp};

/// 投稿作成リクエストの検証エラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PostValidationError {
    #[error("title is required")]
    MissingTitle,

    #[error("author is required")]
    MissingAuthor,

    #[error("attachment name is required")]
    MissingAttachmentName,
}

/// 投稿メタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    /// Q&Aのみ: 回答済みかどうか
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_answered: Option<bool>,
}

/// 投稿本文
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// 添付ファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
    /// 公開オブジェクトURL
    pub url: String,
    pub uploaded_at: String,
}

/// 投稿
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub metadata: PostMetadata,
    #[serde(default)]
    pub content: PostContent,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// アップロード予定の添付ファイル
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttachmentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
}

impl AttachmentRequest {
    /// キーに使うファイル名（`/`は階層を作らないよう`_`に置換）
    pub fn safe_name(&self) -> String {
        self.name.replace('/', "_")
    }
}

/// 投稿作成リクエスト
///
/// お知らせ作成は添付ファイル一覧を`files`キーで送るため、別名として受け付ける。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, alias = "files")]
    pub attachments: Vec<AttachmentRequest>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), PostValidationError> {
        if self.title.trim().is_empty() {
            return Err(PostValidationError::MissingTitle);
        }
        if self.attachments.iter().any(|a| a.name.trim().is_empty()) {
            return Err(PostValidationError::MissingAttachmentName);
        }
        Ok(())
    }
}

impl Post {
    /// 新しい投稿を作成（添付ファイルは後から追加する）
    pub fn create(
        id: String,
        author: String,
        input: &NewPost,
        track_answers: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, PostValidationError> {
        input.validate()?;
        if author.trim().is_empty() {
            return Err(PostValidationError::MissingAuthor);
        }
        let timestamp = format_timestamp(now);

        Ok(Self {
            metadata: PostMetadata {
                id,
                author,
                created_at: timestamp.clone(),
                updated_at: timestamp,
                view_count: 0,
                comment_count: 0,
                is_answered: track_answers.then_some(false),
            },
            content: PostContent {
                title: input.title.clone(),
                body: input.content.clone(),
                summary: input.summary.clone(),
            },
            attachments: Vec::new(),
        })
    }

    /// 閲覧数を1増やす
    pub fn record_view(&mut self) {
        self.metadata.view_count = self.metadata.view_count.saturating_add(1);
    }

    /// 更新日時を設定
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.metadata.updated_at = format_timestamp(now);
    }
}

/// 作成日時の新しい順に並べる
///
/// 日時としてパースできない値は最も古いものとして扱う。
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        let a_time = parse_timestamp(&a.metadata.created_at);
        let b_time = parse_timestamp(&b.metadata.created_at);
        b_time.cmp(&a_time)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_post(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "本文".to_string(),
            summary: None,
            author: Some("kim".to_string()),
            attachments: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_create_post() {
        let post = Post::create("p-1".to_string(), "kim".to_string(), &new_post("質問"), false, now())
            .unwrap();

        assert_eq!(post.metadata.id, "p-1");
        assert_eq!(post.metadata.view_count, 0);
        assert_eq!(post.metadata.created_at, "2024-04-01T12:00:00.000Z");
        assert!(post.metadata.is_answered.is_none());
        assert_eq!(post.content.body, "本文");
    }

    #[test]
    fn test_create_qna_post_tracks_answers() {
        let post =
            Post::create("q-1".to_string(), "kim".to_string(), &new_post("質問"), true, now()).unwrap();
        assert_eq!(post.metadata.is_answered, Some(false));
    }

    #[test]
    fn test_create_rejects_blank_title_and_author() {
        assert_eq!(
            Post::create("p".to_string(), "kim".to_string(), &new_post(" "), false, now()),
            Err(PostValidationError::MissingTitle)
        );
        assert_eq!(
            Post::create("p".to_string(), String::new(), &new_post("t"), false, now()),
            Err(PostValidationError::MissingAuthor)
        );
    }

    #[test]
    fn test_files_alias_for_attachments() {
        let input: NewPost = serde_json::from_str(
            r#"{"title":"お知らせ","content":"c","files":[{"name":"a.pdf","type":"application/pdf"}]}"#,
        )
        .unwrap();

        assert_eq!(input.attachments.len(), 1);
        assert_eq!(input.attachments[0].content_type, "application/pdf");
        assert_eq!(input.attachments[0].size, 0);
    }

    #[test]
    fn test_attachment_without_name_is_rejected() {
        let mut input = new_post("t");
        input.attachments.push(AttachmentRequest {
            name: String::new(),
            content_type: "text/plain".to_string(),
            size: 1,
        });
        assert_eq!(input.validate(), Err(PostValidationError::MissingAttachmentName));
    }

    #[test]
    fn test_safe_name_replaces_slash() {
        let request = AttachmentRequest {
            name: "../etc/passwd".to_string(),
            content_type: String::new(),
            size: 0,
        };
        assert_eq!(request.safe_name(), ".._etc_passwd");
    }

    #[test]
    fn test_record_view() {
        let mut post =
            Post::create("p".to_string(), "kim".to_string(), &new_post("t"), false, now()).unwrap();
        post.record_view();
        post.record_view();
        assert_eq!(post.metadata.view_count, 2);
    }

    #[test]
    fn test_deserialize_post_with_missing_counters() {
        let json = r#"{"metadata":{"id":"p-1","author":"kim","createdAt":"2024-01-01T00:00:00Z"},
                       "content":{"title":"t","body":"b"}}"#;
        let post: Post = serde_json::from_str(json).unwrap();

        assert_eq!(post.metadata.view_count, 0);
        assert!(post.attachments.is_empty());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut posts: Vec<Post> = ["2024-01-02T00:00:00.000Z", "invalid", "2024-03-01T00:00:00.000Z"]
            .iter()
            .enumerate()
            .map(|(i, created_at)| {
                let mut post = Post::create(i.to_string(), "kim".to_string(), &new_post("t"), false, now())
                    .unwrap();
                post.metadata.created_at = created_at.to_string();
                post
            })
            .collect();

        sort_newest_first(&mut posts);

        let ids: Vec<&str> = posts.iter().map(|p| p.metadata.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "0", "1"]);
    }

    #[test]
    fn test_attachment_serialization_uses_type_key() {
        let attachment = Attachment {
            id: "f-1".to_string(),
            key: "posts/p/attachments/f-1-a.png".to_string(),
            name: "a.png".to_string(),
            content_type: "image/png".to_string(),
            size: 10,
            url: "https://bucket.s3.ap-northeast-2.amazonaws.com/posts/p/attachments/f-1-a.png"
                .to_string(),
            uploaded_at: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(&attachment).unwrap();

        assert_eq!(value["type"], "image/png");
        assert_eq!(value["uploadedAt"], "2024-01-01T00:00:00.000Z");
    }
}
