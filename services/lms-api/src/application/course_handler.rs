// 講義管理
//
// 講義レコードは講義テーブルに保存し、同じ内容をオブジェクトストアの
// `<course_path>/meta.json`にも書く。
//
// - POST   /courses                 講義作成（週フォルダも作成）
// - GET    /courses?mainCategory=   カテゴリ別一覧
// - GET    /courses/{id}            講義取得
// - PUT    /courses/{id}            講義更新
// - DELETE /courses/{id}            講義削除（フォルダごと）
// - POST   /courses/upload-urls     教材アップロードURL発行
// - GET    /courses/download-url    教材ダウンロードURL発行

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::application::entry::RequestHandler;
use crate::application::error::{ErrorContext, HandlerError};
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::course::{META_FILE_NAME, WEEK_COUNT, generate_course_id, week_folder_key, week_meta};
use crate::domain::listing::folder_prefix;
use crate::domain::timestamp::format_timestamp;
use crate::domain::{AttachmentRequest, CourseRecord, CourseUpdate, NewCourse, Role};
use crate::infrastructure::object_store::{ObjectStoreError, list_all_keys, write_json};
use crate::infrastructure::{CourseRepository, ObjectStore};

/// 講義を編集できるロール
const COURSE_EDITORS: &[Role] = &[Role::Admin, Role::Instructor];

/// フォルダマーカーのContent-Type
const FOLDER_CONTENT_TYPE: &str = "application/x-directory";

#[derive(Debug, Deserialize)]
struct UploadUrlsRequest {
    #[serde(default)]
    path: String,
    #[serde(default)]
    files: Vec<AttachmentRequest>,
}

/// 教材1件分のアップロード先
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileUploadUrl {
    name: String,
    #[serde(rename = "type")]
    content_type: String,
    size: u64,
    presigned_url: String,
    key: String,
}

/// 講義管理ハンドラー
pub struct CourseHandler<S, CR>
where
    S: ObjectStore,
    CR: CourseRepository,
{
    store: S,
    courses: CR,
}

impl<S, CR> CourseHandler<S, CR>
where
    S: ObjectStore,
    CR: CourseRepository,
{
    pub fn new(store: S, courses: CR) -> Self {
        Self { store, courses }
    }

    async fn create_course(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(COURSE_EDITORS)?;
        let mut input: NewCourse = request.json_body()?;

        // 講師未指定なら作成者を講師とする
        if input.instructor.id.is_empty() {
            let claims = request.claims();
            input.instructor.id = claims.sub.clone().unwrap_or_default();
            input.instructor.name = claims.name.clone().unwrap_or_default();
            input.instructor.email = claims.email.clone().unwrap_or_default();
        }

        let now = Utc::now();
        let course = CourseRecord::create(input, generate_course_id(now), now)
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;
        let course_path = course.course_path();

        self.courses
            .put(&course)
            .await
            .context("Failed to create course")?;
        self.create_folders(&course, &course_path)
            .await
            .context("Failed to create course folders")?;

        info!(course_id = %course.id, course_path = %course_path, "講義作成");
        ApiResponse::ok(&json!({
            "courseId": course.id,
            "coursePath": course_path,
            "course": course,
        }))
    }

    /// 講義フォルダ、meta.json、週フォルダを作成
    async fn create_folders(
        &self,
        course: &CourseRecord,
        course_path: &str,
    ) -> Result<(), ObjectStoreError> {
        self.store
            .put(&format!("{course_path}/"), Vec::new(), FOLDER_CONTENT_TYPE)
            .await?;
        write_json(&self.store, &format!("{course_path}/{META_FILE_NAME}"), course).await?;

        let weeks = (1..=WEEK_COUNT).map(|week| async move {
            let folder = week_folder_key(course_path, week);
            self.store
                .put(&folder, Vec::new(), FOLDER_CONTENT_TYPE)
                .await?;
            write_json(&self.store, &format!("{folder}{META_FILE_NAME}"), &week_meta(week)).await
        });
        join_all(weeks)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, ObjectStoreError>>()?;
        Ok(())
    }

    async fn list_courses(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let main_category = request
            .query_param("mainCategory")
            .ok_or_else(|| HandlerError::bad_request("mainCategory parameter is required"))?;
        let sub_category = request.query_param("subCategory");

        let courses = self
            .courses
            .query_by_category(main_category, sub_category)
            .await
            .context("Failed to list courses")?;
        ApiResponse::ok(&json!({
            "count": courses.len(),
            "courses": courses,
        }))
    }

    async fn get_course(&self, course_id: &str) -> Result<ApiResponse, HandlerError> {
        let course = self
            .courses
            .get(course_id)
            .await
            .context("Failed to get course")?
            .ok_or_else(|| HandlerError::not_found("Course not found"))?;
        ApiResponse::ok(&course)
    }

    async fn update_course(
        &self,
        request: &ApiRequest,
        course_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        request.require_role(COURSE_EDITORS)?;
        let update: CourseUpdate = request.json_body()?;
        update
            .validate()
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;

        let course = self
            .courses
            .update(course_id, &update, &format_timestamp(Utc::now()))
            .await
            .context("Failed to update course")?
            .ok_or_else(|| HandlerError::not_found("Course not found"))?;

        write_json(
            &self.store,
            &format!("{}/{META_FILE_NAME}", course.course_path()),
            &course,
        )
        .await
        .context("Failed to update course metadata")?;

        info!(course_id = %course_id, "講義更新");
        ApiResponse::ok(&course)
    }

    async fn delete_course(
        &self,
        request: &ApiRequest,
        course_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        request.require_role(COURSE_EDITORS)?;

        let course = self
            .courses
            .delete(course_id)
            .await
            .context("Failed to delete course")?
            .ok_or_else(|| HandlerError::not_found("Course not found"))?;

        let keys = list_all_keys(&self.store, &folder_prefix(&course.course_path()))
            .await
            .context("Failed to list course objects")?;
        if !keys.is_empty() {
            self.store
                .delete_many(&keys)
                .await
                .context("Failed to delete course objects")?;
        }

        info!(course_id = %course_id, objects = keys.len(), "講義削除");
        Ok(ApiResponse::message("Course deleted successfully"))
    }

    async fn upload_urls(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(COURSE_EDITORS)?;
        let body: UploadUrlsRequest = request.json_body()?;
        let path = body.path.trim_matches('/');
        if path.is_empty() || body.files.is_empty() {
            return Err(HandlerError::bad_request("path and files are required"));
        }
        if body.files.iter().any(|f| f.name.trim().is_empty()) {
            return Err(HandlerError::bad_request("file name is required"));
        }

        let presigned = join_all(body.files.iter().map(|file| async move {
            let key = format!("{path}/{}", file.name);
            let url = self.store.presign_put(&key, &file.content_type).await?;
            Ok::<_, ObjectStoreError>(FileUploadUrl {
                name: file.name.clone(),
                content_type: file.content_type.clone(),
                size: file.size,
                presigned_url: url,
                key,
            })
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, ObjectStoreError>>()
        .context("Failed to generate presigned URLs")?;

        ApiResponse::ok(&json!({ "presignedUrls": presigned }))
    }

    async fn download_url(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let key = request
            .query_param("path")
            .map(|p| p.trim_start_matches('/'))
            .ok_or_else(|| HandlerError::bad_request("Path parameter is required"))?;

        let url = self
            .store
            .presign_get(key)
            .await
            .context("Failed to generate download URL")?;
        Ok(ApiResponse::ok_value(json!({
            "presignedUrl": url,
            "key": key,
        })))
    }
}

#[async_trait]
impl<S, CR> RequestHandler for CourseHandler<S, CR>
where
    S: ObjectStore,
    CR: CourseRepository,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request.path();
        match *request.method() {
            Method::POST if match_path("/courses", path).is_some() => {
                self.create_course(request).await
            }
            Method::POST if match_path("/courses/upload-urls", path).is_some() => {
                self.upload_urls(request).await
            }
            Method::GET if match_path("/courses", path).is_some() => self.list_courses(request).await,
            Method::GET if match_path("/courses/download-url", path).is_some() => {
                self.download_url(request).await
            }
            Method::GET => match match_path("/courses/{id}", path) {
                Some(params) => self.get_course(params[0]).await,
                None => Err(HandlerError::route_not_found()),
            },
            Method::PUT => match match_path("/courses/{id}", path) {
                Some(params) => self.update_course(request, params[0]).await,
                None => Err(HandlerError::route_not_found()),
            },
            Method::DELETE => match match_path("/courses/{id}", path) {
                Some(params) => self.delete_course(request, params[0]).await,
                None => Err(HandlerError::route_not_found()),
            },
            _ => Err(HandlerError::route_not_found()),
        }
    }
}
