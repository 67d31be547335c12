// コミュニティ掲示板
//
// - POST /community/posts       投稿作成
// - GET  /community/posts       投稿一覧
// - GET  /community/posts/{id}  投稿取得（閲覧数加算）

use async_trait::async_trait;
use http::Method;
use serde_json::json;

use crate::application::board_service::{BoardService, post_author};
use crate::application::entry::RequestHandler;
use crate::application::error::HandlerError;
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::{BoardKind, NewPost};
use crate::infrastructure::ObjectStore;

/// コミュニティ掲示板ハンドラー
pub struct CommunityHandler<S>
where
    S: ObjectStore,
{
    board: BoardService<S>,
}

impl<S> CommunityHandler<S>
where
    S: ObjectStore,
{
    pub fn new(store: S) -> Self {
        Self {
            board: BoardService::new(store, BoardKind::Community),
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
}

#[async_trait]
impl<S> RequestHandler for CommunityHandler<S>
where
    S: ObjectStore,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request.path();
        match *request.method() {
            Method::POST if match_path("/community/posts", path).is_some() => {
                self.create_post(request).await
            }
            Method::GET if match_path("/community/posts", path).is_some() => {
                ApiResponse::ok(&self.board.list().await?)
            }
            Method::GET => match match_path("/community/posts/{id}", path) {
                Some(params) => ApiResponse::ok(&self.board.view(params[0]).await?),
                None => Err(HandlerError::route_not_found()),
            },
            _ => Err(HandlerError::route_not_found()),
        }
    }
}
