// 管理者向け講義フォルダ操作
//
// 講義テーブルには触れず、オブジェクトストア上のフォルダのみを扱う。
//
// - DELETE /admin/courses           フォルダ配下を全削除
// - PUT    /admin/courses/metadata  meta.jsonを上書き
// - PUT    /admin/courses/move      フォルダを別パスへ移動

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use http::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::application::entry::RequestHandler;
use crate::application::error::{ErrorContext, HandlerError};
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::Role;
use crate::domain::course::META_FILE_NAME;
use crate::domain::listing::folder_prefix;
use crate::domain::timestamp::format_timestamp;
use crate::infrastructure::ObjectStore;
use crate::infrastructure::object_store::{ObjectStoreError, list_all_keys, write_json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoursePathRequest {
    #[serde(default)]
    course_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataRequest {
    #[serde(default)]
    course_path: String,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    #[serde(default)]
    old_path: String,
    #[serde(default)]
    new_path: String,
}

/// 管理者向け講義フォルダ操作ハンドラー
pub struct AdminCourseHandler<S>
where
    S: ObjectStore,
{
    store: S,
}

impl<S> AdminCourseHandler<S>
where
    S: ObjectStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn delete_course(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let body: CoursePathRequest = request.json_body()?;
        let prefix = required_prefix(&body.course_path, "coursePath is required")?;

        let keys = list_all_keys(&self.store, &prefix)
            .await
            .context("Failed to list course objects")?;
        if keys.is_empty() {
            return Err(HandlerError::not_found("Course not found"));
        }

        self.store
            .delete_many(&keys)
            .await
            .context("Failed to delete course")?;

        info!(course_path = %body.course_path, objects = keys.len(), "講義フォルダ削除");
        Ok(ApiResponse::message("Course deleted successfully"))
    }

    async fn update_metadata(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let body: MetadataRequest = request.json_body()?;
        let prefix = required_prefix(&body.course_path, "coursePath and metadata are required")?;
        let mut metadata = body
            .metadata
            .ok_or_else(|| HandlerError::bad_request("coursePath and metadata are required"))?;

        metadata.insert(
            "lastModified".to_string(),
            Value::String(format_timestamp(Utc::now())),
        );
        let metadata = Value::Object(metadata);

        write_json(&self.store, &format!("{prefix}{META_FILE_NAME}"), &metadata)
            .await
            .context("Failed to update course metadata")?;

        info!(course_path = %body.course_path, "講義メタデータ更新");
        ApiResponse::ok(&metadata)
    }

    async fn move_course(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let body: MoveRequest = request.json_body()?;
        let old_prefix = required_prefix(&body.old_path, "oldPath and newPath are required")?;
        let new_prefix = required_prefix(&body.new_path, "oldPath and newPath are required")?;
        if old_prefix == new_prefix {
            return Err(HandlerError::bad_request("oldPath and newPath must differ"));
        }
        // 一方が他方の配下だとコピー先と削除対象が重なる
        if new_prefix.starts_with(&old_prefix) || old_prefix.starts_with(&new_prefix) {
            return Err(HandlerError::bad_request(
                "newPath must not be inside oldPath or contain it",
            ));
        }

        let keys = list_all_keys(&self.store, &old_prefix)
            .await
            .context("Failed to list course objects")?;
        if keys.is_empty() {
            return Err(HandlerError::not_found("Course not found"));
        }

        // 全件コピーが成功してから元を消す
        let copies = keys.iter().map(|key| {
            let target = format!("{new_prefix}{}", &key[old_prefix.len()..]);
            async move { self.store.copy(key, &target).await }
        });
        join_all(copies)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, ObjectStoreError>>()
            .context("Failed to copy course")?;

        self.store
            .delete_many(&keys)
            .await
            .context("Failed to delete original course")?;

        info!(
            old_path = %body.old_path,
            new_path = %body.new_path,
            objects = keys.len(),
            "講義フォルダ移動"
        );
        Ok(ApiResponse::ok_value(json!({
            "oldPath": body.old_path,
            "newPath": body.new_path,
            "movedCount": keys.len(),
        })))
    }
}

/// 空でないパスをプレフィックスに変換
fn required_prefix(path: &str, message: &str) -> Result<String, HandlerError> {
    let prefix = folder_prefix(path);
    if prefix.is_empty() {
        return Err(HandlerError::bad_request(message));
    }
    Ok(prefix)
}

#[async_trait]
impl<S> RequestHandler for AdminCourseHandler<S>
where
    S: ObjectStore,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(&[Role::Admin])?;

        let path = request.path();
        match *request.method() {
            Method::DELETE if match_path("/admin/courses", path).is_some() => {
                self.delete_course(request).await
            }
            Method::PUT if match_path("/admin/courses/metadata", path).is_some() => {
                self.update_metadata(request).await
            }
            Method::PUT if match_path("/admin/courses/move", path).is_some() => {
                self.move_course(request).await
            }
            _ => Err(HandlerError::route_not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::object_store::tests::MockObjectStore;
    use http::StatusCode;

    const COURSE: &str = "CLOUD/AWS/courses/c-1";

    fn create_test_handler() -> (AdminCourseHandler<MockObjectStore>, MockObjectStore) {
        let store = MockObjectStore::new();
        store.insert_text(&format!("{COURSE}/"), "");
        store.insert_json(&format!("{COURSE}/meta.json"), &json!({"title": "AWS"}));
        store.insert_text(&format!("{COURSE}/1주차/slide.pdf"), "pdf");
        store.insert_text("CLOUD/AWS/courses/c-10/meta.json", "{}");
        (AdminCourseHandler::new(store.clone()), store)
    }

    fn admin(method: Method, path: &str, body: Value) -> ApiRequest {
        ApiRequest::new(method, path)
            .with_role(Role::Admin)
            .with_body(body)
    }

    #[tokio::test]
    async fn test_requires_admin() {
        let (handler, _) = create_test_handler();
        let request = ApiRequest::new(Method::DELETE, "/admin/courses")
            .with_role(Role::Instructor)
            .with_body(json!({"coursePath": COURSE}));

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    // ==================== 削除 ====================

    #[tokio::test]
    async fn test_delete_course_removes_only_its_folder() {
        let (handler, store) = create_test_handler();

        let response = handler
            .handle(&admin(Method::DELETE, "/admin/courses", json!({"coursePath": COURSE})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.keys_with_prefix(&format!("{COURSE}/")).is_empty());
        assert!(store.contains("CLOUD/AWS/courses/c-10/meta.json"));
    }

    #[tokio::test]
    async fn test_delete_missing_course() {
        let (handler, _) = create_test_handler();

        let result = handler
            .handle(&admin(
                Method::DELETE,
                "/admin/courses",
                json!({"coursePath": "CLOUD/AWS/courses/none"}),
            ))
            .await;

        assert_eq!(result, Err(HandlerError::NotFound("Course not found".to_string())));
    }

    #[tokio::test]
    async fn test_delete_requires_path() {
        let (handler, store) = create_test_handler();

        let err = handler
            .handle(&admin(Method::DELETE, "/admin/courses", json!({"coursePath": "/"})))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.keys().len(), 4);
    }

    // ==================== メタデータ ====================

    #[tokio::test]
    async fn test_update_metadata_adds_last_modified() {
        let (handler, store) = create_test_handler();
        let request = admin(
            Method::PUT,
            "/admin/courses/metadata",
            json!({"coursePath": COURSE, "metadata": {"title": "AWS 応用", "level": "ADVANCED"}}),
        );

        handler.handle(&request).await.unwrap();

        let meta = store.object_json(&format!("{COURSE}/meta.json")).unwrap();
        assert_eq!(meta["title"], "AWS 応用");
        assert_eq!(meta["level"], "ADVANCED");
        assert!(meta["lastModified"].is_string());
    }

    #[tokio::test]
    async fn test_update_metadata_requires_object() {
        let (handler, _) = create_test_handler();
        let request = admin(
            Method::PUT,
            "/admin/courses/metadata",
            json!({"coursePath": COURSE}),
        );

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    // ==================== 移動 ====================

    #[tokio::test]
    async fn test_move_course() {
        let (handler, store) = create_test_handler();
        let request = admin(
            Method::PUT,
            "/admin/courses/move",
            json!({"oldPath": COURSE, "newPath": "CLOUD/GCP/courses/c-1"}),
        );

        let response = handler.handle(&request).await.unwrap();

        assert_eq!(response.data().unwrap()["movedCount"], 3);
        assert!(store.contains("CLOUD/GCP/courses/c-1/"));
        assert!(store.contains("CLOUD/GCP/courses/c-1/1주차/slide.pdf"));
        assert_eq!(
            store.object_json("CLOUD/GCP/courses/c-1/meta.json").unwrap()["title"],
            "AWS"
        );
        assert!(store.keys_with_prefix(&format!("{COURSE}/")).is_empty());
    }

    #[tokio::test]
    async fn test_move_into_nested_path_is_rejected() {
        let (handler, store) = create_test_handler();
        store.insert_text("a/x", "original-a-x");
        store.insert_text("a/b/x", "original-a-b-x");

        for (old_path, new_path) in [("a", "a/b"), ("a/b", "a")] {
            let request = admin(
                Method::PUT,
                "/admin/courses/move",
                json!({"oldPath": old_path, "newPath": new_path}),
            );

            let err = handler.handle(&request).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }

        assert_eq!(store.object_text("a/x").as_deref(), Some("original-a-x"));
        assert_eq!(store.object_text("a/b/x").as_deref(), Some("original-a-b-x"));
        assert_eq!(store.keys_with_prefix("a/").len(), 2);
    }

    #[tokio::test]
    async fn test_move_to_sibling_with_shared_name_prefix() {
        let (handler, store) = create_test_handler();
        store.insert_text("a/x", "x");

        let request = admin(
            Method::PUT,
            "/admin/courses/move",
            json!({"oldPath": "a", "newPath": "ab"}),
        );
        handler.handle(&request).await.unwrap();

        assert_eq!(store.object_text("ab/x").as_deref(), Some("x"));
        assert!(!store.contains("a/x"));
    }

    #[tokio::test]
    async fn test_move_missing_course() {
        let (handler, _) = create_test_handler();
        let request = admin(
            Method::PUT,
            "/admin/courses/move",
            json!({"oldPath": "CLOUD/AWS/courses/none", "newPath": "CLOUD/GCP/courses/none"}),
        );

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_move_storage_failure_keeps_originals() {
        let (handler, store) = create_test_handler();
        let request = admin(
            Method::PUT,
            "/admin/courses/move",
            json!({"oldPath": COURSE, "newPath": "CLOUD/GCP/courses/c-1"}),
        );
        store.set_next_error(ObjectStoreError::ReadError("denied".to_string()));

        let err = handler.handle(&request).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.keys().len(), 4);
        assert!(store.keys_with_prefix("CLOUD/GCP/").is_empty());
    }
}
