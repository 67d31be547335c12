// 受講登録
//
// - POST   /enrollments                 受講登録（承認待ちで作成）
// - GET    /enrollments?studentId=|courseId=
// - PUT    /enrollments/status          状態変更（管理者・講師）
// - DELETE /enrollments                 登録削除（管理者のみ）

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
use crate::domain::timestamp::format_timestamp;
use crate::domain::{EnrollmentRecord, EnrollmentStatus, Role};
use crate::infrastructure::EnrollmentRepository;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    #[serde(default)]
    course_id: String,
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    enrolled_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    #[serde(default)]
    course_id: String,
    #[serde(default)]
    student_id: String,
    #[serde(default)]
    status: Option<EnrollmentStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollmentKeyRequest {
    #[serde(default)]
    course_id: String,
    #[serde(default)]
    student_id: String,
}

/// 受講登録ハンドラー
pub struct EnrollmentHandler<ER>
where
    ER: EnrollmentRepository,
{
    enrollments: ER,
}

impl<ER> EnrollmentHandler<ER>
where
    ER: EnrollmentRepository,
{
    pub fn new(enrollments: ER) -> Self {
        Self { enrollments }
    }

    async fn enroll(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let role = request.require_role(&[Role::Admin, Role::Instructor, Role::Student])?;
        let body: EnrollRequest = request.json_body()?;

        let caller = request.claims().sub.as_deref();
        let student_id = body
            .student_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(caller)
            .map(str::to_string);
        let (course_id, student_id) = match student_id {
            Some(student_id) if !body.course_id.trim().is_empty() => (body.course_id, student_id),
            _ => return Err(HandlerError::bad_request("courseId and studentId are required")),
        };

        if role == Role::Student && caller != Some(student_id.as_str()) {
            return Err(HandlerError::Forbidden(
                "Students can only enroll themselves".to_string(),
            ));
        }

        let enrollment = EnrollmentRecord::new(course_id, student_id, body.enrolled_at, Utc::now());
        self.enrollments
            .put(&enrollment)
            .await
            .context("Failed to create enrollment")?;

        info!(
            course_id = %enrollment.course_id,
            student_id = %enrollment.student_id,
            "受講登録"
        );
        ApiResponse::ok(&enrollment)
    }

    async fn list(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let result = match (request.query_param("studentId"), request.query_param("courseId")) {
            (Some(student_id), _) => self.enrollments.list_by_student(student_id).await,
            (None, Some(course_id)) => self.enrollments.list_by_course(course_id).await,
            (None, None) => {
                return Err(HandlerError::bad_request(
                    "studentId or courseId parameter is required",
                ));
            }
        };
        let enrollments = result.context("Failed to get enrollments")?;

        ApiResponse::ok(&json!({
            "count": enrollments.len(),
            "enrollments": enrollments,
        }))
    }

    async fn update_status(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(&[Role::Admin, Role::Instructor])?;
        let body: StatusRequest = request.json_body()?;
        let status = match body.status {
            Some(status) if !body.course_id.is_empty() && !body.student_id.is_empty() => status,
            _ => {
                return Err(HandlerError::bad_request(
                    "courseId, studentId and status are required",
                ));
            }
        };

        let updated = self
            .enrollments
            .update_status(
                &body.course_id,
                &body.student_id,
                status,
                &format_timestamp(Utc::now()),
            )
            .await
            .context("Failed to update enrollment")?
            .ok_or_else(|| HandlerError::not_found("Enrollment not found"))?;

        info!(
            course_id = %body.course_id,
            student_id = %body.student_id,
            status = ?status,
            "受講状態変更"
        );
        ApiResponse::ok(&updated)
    }

    async fn delete(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(&[Role::Admin])?;
        let body: EnrollmentKeyRequest = request.json_body()?;
        if body.course_id.is_empty() || body.student_id.is_empty() {
            return Err(HandlerError::bad_request("courseId and studentId are required"));
        }

        let deleted = self
            .enrollments
            .delete(&body.course_id, &body.student_id)
            .await
            .context("Failed to delete enrollment")?
            .ok_or_else(|| HandlerError::not_found("Enrollment not found"))?;

        ApiResponse::ok(&json!({ "deletedEnrollment": deleted }))
    }
}

#[async_trait]
impl<ER> RequestHandler for EnrollmentHandler<ER>
where
    ER: EnrollmentRepository,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request.path();
        match *request.method() {
            Method::POST if match_path("/enrollments", path).is_some() => self.enroll(request).await,
            Method::GET if match_path("/enrollments", path).is_some() => self.list(request).await,
            Method::PUT if match_path("/enrollments/status", path).is_some() => {
                self.update_status(request).await
            }
            Method::DELETE if match_path("/enrollments", path).is_some() => {
                self.delete(request).await
            }
            _ => Err(HandlerError::route_not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::enrollment_repository::tests::MockEnrollmentRepository;
    use http::StatusCode;

    fn create_test_handler() -> (
        EnrollmentHandler<MockEnrollmentRepository>,
        MockEnrollmentRepository,
    ) {
        let enrollments = MockEnrollmentRepository::new();
        enrollments.insert("c-1", "s-1", EnrollmentStatus::Active);
        enrollments.insert("c-1", "s-2", EnrollmentStatus::Pending);
        enrollments.insert("c-2", "s-1", EnrollmentStatus::Completed);
        (EnrollmentHandler::new(enrollments.clone()), enrollments)
    }

    fn student(method: Method, path: &str, sub: &str) -> ApiRequest {
        ApiRequest::new(method, path)
            .with_role(Role::Student)
            .with_user(sub)
    }

    // ==================== 登録 ====================

    #[tokio::test]
    async fn test_student_enrolls_self_by_default() {
        let (handler, enrollments) = create_test_handler();
        let request =
            student(Method::POST, "/enrollments", "s-3").with_body(json!({"courseId": "c-1"}));

        let response = handler.handle(&request).await.unwrap();

        assert_eq!(response.data().unwrap()["status"], "PENDING");
        let saved = enrollments.get_enrollment("c-1", "s-3").unwrap();
        assert_eq!(saved.status, EnrollmentStatus::Pending);
        assert_eq!(saved.enrolled_at, saved.updated_at);
    }

    #[tokio::test]
    async fn test_student_cannot_enroll_others() {
        let (handler, enrollments) = create_test_handler();
        let request = student(Method::POST, "/enrollments", "s-3")
            .with_body(json!({"courseId": "c-1", "studentId": "s-9"}));

        let err = handler.handle(&request).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(enrollments.get_enrollment("c-1", "s-9").is_none());
    }

    #[tokio::test]
    async fn test_admin_enrolls_student_with_date() {
        let (handler, enrollments) = create_test_handler();
        let request = ApiRequest::new(Method::POST, "/enrollments")
            .with_role(Role::Admin)
            .with_user("admin-1")
            .with_body(json!({
                "courseId": "c-2",
                "studentId": "s-2",
                "enrolledAt": "2024-03-01T00:00:00.000Z",
            }));

        handler.handle(&request).await.unwrap();

        let saved = enrollments.get_enrollment("c-2", "s-2").unwrap();
        assert_eq!(saved.enrolled_at, "2024-03-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_enroll_requires_course() {
        let (handler, _) = create_test_handler();
        let request = student(Method::POST, "/enrollments", "s-3").with_body(json!({}));

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    // ==================== 一覧 ====================

    #[tokio::test]
    async fn test_list_by_student_and_course() {
        let (handler, _) = create_test_handler();

        let by_student = handler
            .handle(&ApiRequest::new(Method::GET, "/enrollments").with_query("studentId", "s-1"))
            .await
            .unwrap();
        assert_eq!(by_student.data().unwrap()["count"], 2);

        let by_course = handler
            .handle(&ApiRequest::new(Method::GET, "/enrollments").with_query("courseId", "c-1"))
            .await
            .unwrap();
        assert_eq!(by_course.data().unwrap()["count"], 2);
        assert_eq!(
            by_course.data().unwrap()["enrollments"][0]["course_id"],
            "c-1"
        );
    }

    #[tokio::test]
    async fn test_list_requires_filter() {
        let (handler, _) = create_test_handler();

        let err = handler
            .handle(&ApiRequest::new(Method::GET, "/enrollments"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    // ==================== 状態変更・削除 ====================

    #[tokio::test]
    async fn test_update_status() {
        let (handler, enrollments) = create_test_handler();
        let request = ApiRequest::new(Method::PUT, "/enrollments/status")
            .with_role(Role::Instructor)
            .with_body(json!({"courseId": "c-1", "studentId": "s-2", "status": "ACTIVE"}));

        let response = handler.handle(&request).await.unwrap();

        assert_eq!(response.data().unwrap()["status"], "ACTIVE");
        assert_eq!(
            enrollments.get_enrollment("c-1", "s-2").unwrap().status,
            EnrollmentStatus::Active
        );
    }

    #[tokio::test]
    async fn test_update_status_errors() {
        let (handler, _) = create_test_handler();

        let by_student = student(Method::PUT, "/enrollments/status", "s-1")
            .with_body(json!({"courseId": "c-1", "studentId": "s-1", "status": "COMPLETED"}));
        assert_eq!(
            handler.handle(&by_student).await.unwrap_err().status(),
            StatusCode::FORBIDDEN
        );

        let unknown_status = ApiRequest::new(Method::PUT, "/enrollments/status")
            .with_role(Role::Admin)
            .with_body(json!({"courseId": "c-1", "studentId": "s-1", "status": "PAUSED"}));
        assert_eq!(
            handler.handle(&unknown_status).await.unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );

        let missing = ApiRequest::new(Method::PUT, "/enrollments/status")
            .with_role(Role::Admin)
            .with_body(json!({"courseId": "c-9", "studentId": "s-1", "status": "ACTIVE"}));
        assert_eq!(
            handler.handle(&missing).await,
            Err(HandlerError::NotFound("Enrollment not found".to_string()))
        );
    }

    #[tokio::test]
    async fn test_delete_enrollment() {
        let (handler, enrollments) = create_test_handler();
        let request = ApiRequest::new(Method::DELETE, "/enrollments")
            .with_role(Role::Admin)
            .with_body(json!({"courseId": "c-2", "studentId": "s-1"}));

        let response = handler.handle(&request).await.unwrap();

        assert_eq!(
            response.data().unwrap()["deletedEnrollment"]["status"],
            "COMPLETED"
        );
        assert_eq!(enrollments.enrollment_count(), 2);

        let err = handler.handle(&request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
