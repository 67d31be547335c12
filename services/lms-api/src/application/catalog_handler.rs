// 講義カタログの閲覧
//
// - GET /categories                                  大分類一覧
// - GET /categories/{category}/subcategories         小分類一覧
// - GET /categories/{main}/{sub}/courses             カテゴリ内の講義（meta.json）
// - GET /folders?path=                               フォルダ表示
// - GET /files?path=                                 ファイル内容
// - GET /catalog[?path=]                             フォルダ表示またはカテゴリツリー

use async_trait::async_trait;
use futures::future::join_all;
use http::Method;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::application::entry::RequestHandler;
use crate::application::error::{ErrorContext, HandlerError};
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::catalog::group_by_category;
use crate::domain::course::{META_FILE_NAME, courses_prefix};
use crate::domain::listing::{categories, folder_entries, folder_prefix};
use crate::domain::{FolderEntry, ObjectListing};
use crate::infrastructure::object_store::{ObjectStoreError, read_json};
use crate::infrastructure::{CourseRepository, ObjectStore};

/// 講義カタログハンドラー
pub struct CatalogHandler<S, CR>
where
    S: ObjectStore,
    CR: CourseRepository,
{
    store: S,
    courses: CR,
}

impl<S, CR> CatalogHandler<S, CR>
where
    S: ObjectStore,
    CR: CourseRepository,
{
    pub fn new(store: S, courses: CR) -> Self {
        Self { store, courses }
    }

    async fn list_folder(&self, prefix: &str) -> Result<ObjectListing, HandlerError> {
        self.store
            .list(prefix, true)
            .await
            .context("Failed to list objects")
    }

    async fn list_categories(&self, prefix: &str) -> Result<ApiResponse, HandlerError> {
        let listing = self.list_folder(prefix).await?;
        ApiResponse::ok(&categories(&listing))
    }

    /// カテゴリ内の各講義フォルダの`meta.json`を並行に読む
    async fn list_courses(&self, main: &str, sub: &str) -> Result<ApiResponse, HandlerError> {
        let listing = self.list_folder(&courses_prefix(main, sub)).await?;

        let reads = listing.prefixes.iter().map(|folder| async move {
            let meta: Result<Map<String, Value>, ObjectStoreError> =
                read_json(&self.store, &format!("{folder}{META_FILE_NAME}")).await;
            (folder, meta)
        });

        let courses: Vec<Value> = join_all(reads)
            .await
            .into_iter()
            .filter_map(|(folder, meta)| match meta {
                Ok(mut meta) => {
                    meta.insert("path".to_string(), Value::String(folder.clone()));
                    Some(Value::Object(meta))
                }
                Err(err) => {
                    warn!(folder = %folder, error = %err, "講義メタデータの読み込みに失敗");
                    None
                }
            })
            .collect();

        Ok(ApiResponse::ok_value(Value::Array(courses)))
    }

    async fn folders(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let prefix = folder_prefix(request.query_param("path").unwrap_or_default());
        let listing = self.list_folder(&prefix).await?;
        Ok(ApiResponse::ok_value(json!({ "folders": folder_entries(&listing) })))
    }

    async fn file_content(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request
            .query_param("path")
            .ok_or_else(|| HandlerError::bad_request("path parameter is required"))?;
        let key = path.trim_start_matches('/');

        match self.store.get_text(key).await {
            Ok(content) => Ok(ApiResponse::ok_value(json!({
                "path": key,
                "content": content,
            }))),
            Err(ObjectStoreError::NotFound(_)) => Err(HandlerError::not_found("File not found")),
            Err(err) => Err(HandlerError::internal("Failed to get file", err)),
        }
    }

    async fn catalog(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        if let Some(path) = request.query_param("path") {
            let listing = self.list_folder(&folder_prefix(path)).await?;
            let (folders, files): (Vec<FolderEntry>, Vec<FolderEntry>) = folder_entries(&listing)
                .into_iter()
                .partition(|entry| matches!(entry, FolderEntry::Directory { .. }));
            return Ok(ApiResponse::ok_value(json!({
                "folders": folders,
                "files": files,
            })));
        }

        let courses = self
            .courses
            .scan_all()
            .await
            .context("Failed to get catalog")?;
        let categories = group_by_category(&courses);
        ApiResponse::ok(&json!({
            "courses": courses,
            "categories": categories,
        }))
    }
}

#[async_trait]
impl<S, CR> RequestHandler for CatalogHandler<S, CR>
where
    S: ObjectStore,
    CR: CourseRepository,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        if request.method() != Method::GET {
            return Err(HandlerError::route_not_found());
        }

        let path = request.path();
        if match_path("/categories", path).is_some() {
            self.list_categories("").await
        } else if let Some(params) = match_path("/categories/{category}/subcategories", path) {
            self.list_categories(&folder_prefix(params[0])).await
        } else if let Some(params) = match_path("/categories/{main}/{sub}/courses", path) {
            self.list_courses(params[0], params[1]).await
        } else if match_path("/folders", path).is_some() {
            self.folders(request).await
        } else if match_path("/files", path).is_some() {
            self.file_content(request).await
        } else if match_path("/catalog", path).is_some() {
            self.catalog(request).await
        } else {
            Err(HandlerError::route_not_found())
        }
    }
}
