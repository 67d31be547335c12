// 管理者向けユーザー管理
//
// - GET    /admin/users       受講生一覧
// - PUT    /admin/users/role  ロール変更
// - DELETE /admin/users       ユーザー削除

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::application::entry::RequestHandler;
use crate::application::error::{ErrorContext, HandlerError};
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::Role;
use crate::domain::timestamp::format_timestamp;
use crate::infrastructure::UserRepository;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleChangeRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDeleteRequest {
    #[serde(default)]
    user_id: String,
}

/// 管理者向けユーザー管理ハンドラー
pub struct AdminUserHandler<UR>
where
    UR: UserRepository,
{
    users: UR,
}

impl<UR> AdminUserHandler<UR>
where
    UR: UserRepository,
{
    pub fn new(users: UR) -> Self {
        Self { users }
    }

    async fn list_students(&self) -> Result<ApiResponse, HandlerError> {
        let students = self
            .users
            .list_by_role(Role::Student)
            .await
            .context("Failed to list students")?;
        ApiResponse::ok(&students)
    }

    async fn change_role(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let body: RoleChangeRequest = request.json_body()?;
        if body.user_id.trim().is_empty() || body.role.trim().is_empty() {
            return Err(HandlerError::bad_request("userId and role are required"));
        }
        let role = body
            .role
            .parse::<Role>()
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;

        let updated = self
            .users
            .update_role(&body.user_id, role, &format_timestamp(Utc::now()))
            .await
            .context("Failed to update user role")?
            .ok_or_else(|| HandlerError::not_found("User not found"))?;

        info!(user_id = %body.user_id, role = %role, "ユーザーロール変更");
        ApiResponse::ok(&updated)
    }

    async fn delete_user(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let body: UserDeleteRequest = request.json_body()?;
        if body.user_id.trim().is_empty() {
            return Err(HandlerError::bad_request("userId is required"));
        }

        let deleted = self
            .users
            .delete(&body.user_id)
            .await
            .context("Failed to delete user")?
            .ok_or_else(|| HandlerError::not_found("User not found"))?;

        info!(user_id = %body.user_id, "ユーザー削除");
        ApiResponse::ok(&json!({ "deletedUser": deleted }))
    }
}

#[async_trait]
impl<UR> RequestHandler for AdminUserHandler<UR>
where
    UR: UserRepository,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(&[Role::Admin])?;

        let path = request.path();
        match *request.method() {
            Method::GET if match_path("/admin/users", path).is_some() => self.list_students().await,
            Method::PUT if match_path("/admin/users/role", path).is_some() => {
                self.change_role(request).await
            }
            Method::DELETE if match_path("/admin/users", path).is_some() => {
                self.delete_user(request).await
            }
            _ => Err(HandlerError::route_not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::RepositoryError;
    use crate::infrastructure::user_repository::tests::MockUserRepository;
    use http::StatusCode;

    fn create_test_handler() -> (AdminUserHandler<MockUserRepository>, MockUserRepository) {
        let users = MockUserRepository::new();
        users.insert("s-1", "Kim", Role::Student);
        users.insert("s-2", "Park", Role::Student);
        users.insert("i-1", "Lee", Role::Instructor);
        (AdminUserHandler::new(users.clone()), users)
    }

    fn admin(method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, path).with_role(Role::Admin)
    }

    // ==================== 権限 ====================

    #[tokio::test]
    async fn test_non_admin_is_rejected() {
        let (handler, _) = create_test_handler();
        let request = ApiRequest::new(Method::GET, "/admin/users").with_role(Role::Instructor);

        let result = handler.handle(&request).await;

        assert_eq!(
            result,
            Err(HandlerError::Forbidden(
                "Unauthorized: Admin access required".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_missing_role_claim_is_rejected() {
        let (handler, _) = create_test_handler();
        let request = ApiRequest::new(Method::GET, "/admin/users");

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    // ==================== 一覧 ====================

    #[tokio::test]
    async fn test_list_students_only() {
        let (handler, _) = create_test_handler();

        let response = handler.handle(&admin(Method::GET, "/admin/users/")).await.unwrap();

        let data = response.data().unwrap().as_array().unwrap().clone();
        assert_eq!(data.len(), 2);
        assert!(data.iter().all(|u| u["role"] == "STUDENT"));
    }

    #[tokio::test]
    async fn test_list_failure_is_internal_error() {
        let (handler, users) = create_test_handler();
        users.set_next_error(RepositoryError::ReadError("throttled".to_string()));

        let err = handler.handle(&admin(Method::GET, "/admin/users")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ==================== ロール変更 ====================

    #[tokio::test]
    async fn test_change_role() {
        let (handler, users) = create_test_handler();
        let request = admin(Method::PUT, "/admin/users/role")
            .with_body(json!({"userId": "s-1", "role": "INSTRUCTOR"}));

        let response = handler.handle(&request).await.unwrap();

        assert_eq!(response.data().unwrap()["role"], "INSTRUCTOR");
        let user = users.get_user("s-1").unwrap();
        assert_eq!(user.role, Role::Instructor);
        assert!(user.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_change_role_unknown_user() {
        let (handler, _) = create_test_handler();
        let request = admin(Method::PUT, "/admin/users/role")
            .with_body(json!({"userId": "ghost", "role": "ADMIN"}));

        assert_eq!(
            handler.handle(&request).await,
            Err(HandlerError::NotFound("User not found".to_string()))
        );
    }

    #[tokio::test]
    async fn test_change_role_rejects_unknown_role() {
        let (handler, users) = create_test_handler();
        let request = admin(Method::PUT, "/admin/users/role")
            .with_body(json!({"userId": "s-1", "role": "GUEST"}));

        let err = handler.handle(&request).await.unwrap_err();

        assert_eq!(err, HandlerError::BadRequest("unknown role: GUEST".to_string()));
        assert_eq!(users.get_user("s-1").unwrap().role, Role::Student);
    }

    #[tokio::test]
    async fn test_change_role_requires_fields() {
        let (handler, _) = create_test_handler();
        let request = admin(Method::PUT, "/admin/users/role").with_body(json!({"userId": "s-1"}));

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    // ==================== 削除 ====================

    #[tokio::test]
    async fn test_delete_user_returns_deleted_record() {
        let (handler, users) = create_test_handler();
        let request = admin(Method::DELETE, "/admin/users").with_body(json!({"userId": "s-2"}));

        let response = handler.handle(&request).await.unwrap();

        assert_eq!(response.data().unwrap()["deletedUser"]["id"], "s-2");
        assert!(users.get_user("s-2").is_none());
        assert_eq!(users.user_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_user() {
        let (handler, _) = create_test_handler();
        let request = admin(Method::DELETE, "/admin/users").with_body(json!({"userId": "ghost"}));

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    // ==================== ルーティング ====================

    #[tokio::test]
    async fn test_unknown_route() {
        let (handler, _) = create_test_handler();

        assert_eq!(
            handler.handle(&admin(Method::POST, "/admin/users")).await,
            Err(HandlerError::route_not_found())
        );
        assert_eq!(
            handler.handle(&admin(Method::GET, "/admin/other")).await,
            Err(HandlerError::route_not_found())
        );
    }
}
