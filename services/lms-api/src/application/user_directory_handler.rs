// ユーザー検索
//
// - GET /users?role=<ROLE>  ロールで絞り込み
// - GET /users/all          全ユーザー（管理者のみ）

use async_trait::async_trait;
use http::Method;

use crate::application::entry::RequestHandler;
use crate::application::error::{ErrorContext, HandlerError};
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::Role;
use crate::infrastructure::UserRepository;

/// ユーザー検索ハンドラー
pub struct UserDirectoryHandler<UR>
where
    UR: UserRepository,
{
    users: UR,
}

impl<UR> UserDirectoryHandler<UR>
where
    UR: UserRepository,
{
    pub fn new(users: UR) -> Self {
        Self { users }
    }

    async fn users_by_role(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let role = request
            .query_param("role")
            .ok_or_else(|| HandlerError::bad_request("Role parameter is required"))?
            .parse::<Role>()
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;

        let users = self
            .users
            .scan(Some(role))
            .await
            .context("Failed to get users by role")?;
        ApiResponse::ok(&users)
    }

    async fn all_users(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(&[Role::Admin])?;

        let users = self
            .users
            .scan(None)
            .await
            .context("Failed to get all users")?;
        ApiResponse::ok(&users)
    }
}

#[async_trait]
impl<UR> RequestHandler for UserDirectoryHandler<UR>
where
    UR: UserRepository,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request.path();
        match *request.method() {
            Method::GET if match_path("/users/all", path).is_some() => self.all_users(request).await,
            Method::GET if match_path("/users", path).is_some() => {
                self.users_by_role(request).await
            }
            _ => Err(HandlerError::route_not_found()),
        }
    }
}
