// Q&A掲示板
//
// パスは`/qna`と`/qna/{id}`のみで、メソッドで処理を振り分ける。
//
// - GET    /qna        一覧
// - GET    /qna/{id}   取得（閲覧数加算）
// - POST   /qna        作成（IDを付けた場合は405）
// - PUT    /qna/{id}   上書き保存
// - DELETE /qna/{id}   削除（添付ファイルも）

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::application::board_service::{BoardService, post_author};
use crate::application::entry::RequestHandler;
use crate::application::error::HandlerError;
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::{BoardKind, NewPost, Post};
use crate::infrastructure::ObjectStore;

/// Q&A掲示板ハンドラー
pub struct QnaHandler<S>
where
    S: ObjectStore,
{
    board: BoardService<S>,
}

impl<S> QnaHandler<S>
where
    S: ObjectStore,
{
    pub fn new(store: S) -> Self {
        Self {
            board: BoardService::new(store, BoardKind::Qna),
        }
    }

    async fn create_post(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let input: NewPost = request.json_body()?;
        let author = post_author(&input, request.claims());

        let created = self.board.create(author, &input).await?;
        ApiResponse::ok(&json!({
            "postId": created.post.metadata.id,
            "attachmentUrls": created.upload_urls,
        }))
    }

    /// 送られた投稿でそのまま上書きする（IDはパスの値に固定）
    async fn update_post(
        &self,
        request: &ApiRequest,
        post_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        let mut body: Map<String, Value> = request.json_body()?;

        let metadata = body
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(metadata) = metadata else {
            return Err(HandlerError::bad_request("metadata must be an object"));
        };
        metadata.insert("id".to_string(), Value::String(post_id.to_string()));

        let mut post: Post = serde_json::from_value(Value::Object(body))
            .map_err(|e| HandlerError::bad_request(format!("Invalid request body: {e}")))?;
        post.touch(Utc::now());

        self.board.save(&post).await?;

        info!(post_id = post_id, "Q&A投稿更新");
        Ok(ApiResponse::message("Post updated successfully"))
    }

    async fn delete_post(&self, post_id: &str) -> Result<ApiResponse, HandlerError> {
        self.board.delete(post_id).await?;
        Ok(ApiResponse::message("Post deleted successfully"))
    }
}

#[async_trait]
impl<S> RequestHandler for QnaHandler<S>
where
    S: ObjectStore,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request.path();
        let post_id = if match_path("/qna", path).is_some() {
            None
        } else if let Some(params) = match_path("/qna/{id}", path) {
            Some(params[0])
        } else {
            return Err(HandlerError::route_not_found());
        };

        match (request.method().clone(), post_id) {
            (Method::GET, None) => ApiResponse::ok(&self.board.list().await?),
            (Method::GET, Some(id)) => ApiResponse::ok(&self.board.view(id).await?),
            (Method::POST, None) => self.create_post(request).await,
            (Method::PUT, Some(id)) => self.update_post(request, id).await,
            (Method::DELETE, Some(id)) => self.delete_post(id).await,
            (Method::PUT | Method::DELETE, None) => {
                Err(HandlerError::bad_request("Post ID is required"))
            }
            _ => Err(HandlerError::MethodNotAllowed),
        }
    }
}
