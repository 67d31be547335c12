// お知らせ
//
// - POST   /notices       作成（管理者のみ）
// - GET    /notices       一覧
// - GET    /notices/{id}  取得（閲覧数加算）
// - DELETE /notices/{id}  削除（管理者のみ）

use async_trait::async_trait;
use http::Method;
use serde_json::json;

use crate::application::board_service::{BoardService, post_author};
use crate::application::entry::RequestHandler;
use crate::application::error::HandlerError;
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::{BoardKind, NewPost, Role};
use crate::infrastructure::ObjectStore;

/// お知らせハンドラー
pub struct NoticeHandler<S>
where
    S: ObjectStore,
{
    board: BoardService<S>,
}

impl<S> NoticeHandler<S>
where
    S: ObjectStore,
{
    pub fn new(store: S) -> Self {
        Self {
            board: BoardService::new(store, BoardKind::Notice),
        }
    }

    async fn create_notice(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(&[Role::Admin])?;
        let input: NewPost = request.json_body()?;
        let author = post_author(&input, request.claims());

        let created = self.board.create(author, &input).await?;
        ApiResponse::ok(&json!({
            "noticeId": created.post.metadata.id,
            "presignedUrls": created.upload_urls,
        }))
    }

    async fn list_notices(&self) -> Result<ApiResponse, HandlerError> {
        let notices = self.board.list().await?;
        ApiResponse::ok(&json!({ "notices": notices }))
    }

    async fn delete_notice(
        &self,
        request: &ApiRequest,
        notice_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        request.require_role(&[Role::Admin])?;
        self.board.delete_existing(notice_id).await?;
        Ok(ApiResponse::message("Notice deleted successfully"))
    }
}

#[async_trait]
impl<S> RequestHandler for NoticeHandler<S>
where
    S: ObjectStore,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request.path();
        if match_path("/notices", path).is_some() {
            return match *request.method() {
                Method::POST => self.create_notice(request).await,
                Method::GET => self.list_notices().await,
                _ => Err(HandlerError::route_not_found()),
            };
        }

        let Some(params) = match_path("/notices/{id}", path) else {
            return Err(HandlerError::route_not_found());
        };
        match *request.method() {
            Method::GET => ApiResponse::ok(&self.board.view(params[0]).await?),
            Method::DELETE => self.delete_notice(request, params[0]).await,
            _ => Err(HandlerError::route_not_found()),
        }
    }
}
