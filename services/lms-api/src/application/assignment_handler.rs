// 課題・試験
//
// - POST /admin/assignments                                         配布
// - GET  /admin/assignments/course/{courseId}                       項目別集計
// - PUT  /admin/assignments/{courseId}/{studentId}/{itemId}/grade   採点
// - GET  /students/{studentId}/assignments                          受講生の一覧
// - POST /students/{studentId}/assignments/{courseId}/{itemId}/submit  提出

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::application::entry::RequestHandler;
use crate::application::error::{ErrorContext, HandlerError};
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;
use crate::application::route::match_path;
use crate::domain::assignment::{group_for_student, summarize_course};
use crate::domain::timestamp::format_timestamp;
use crate::domain::{AssignmentRecord, NewAssignment, Role, SubmissionFile};
use crate::infrastructure::{AssignmentRepository, EnrollmentRepository};

/// 配布・採点ができるロール
const GRADERS: &[Role] = &[Role::Admin, Role::Instructor];

/// ログイン済みのすべてのロール
const ALL_ROLES: &[Role] = &[Role::Admin, Role::Instructor, Role::Student];

#[derive(Debug, Deserialize)]
struct GradeRequest {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    files: Vec<SubmissionFile>,
}

/// 課題ハンドラー
pub struct AssignmentHandler<AR, ER>
where
    AR: AssignmentRepository,
    ER: EnrollmentRepository,
{
    assignments: AR,
    enrollments: ER,
}

impl<AR, ER> AssignmentHandler<AR, ER>
where
    AR: AssignmentRepository,
    ER: EnrollmentRepository,
{
    pub fn new(assignments: AR, enrollments: ER) -> Self {
        Self {
            assignments,
            enrollments,
        }
    }

    /// 取り消し以外の受講生全員に未提出レコードを作成
    async fn assign(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        request.require_role(GRADERS)?;
        let item: NewAssignment = request.json_body()?;
        item.validate()
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;

        let item_id = item
            .item_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let enrollments = self
            .enrollments
            .list_by_course(&item.course_id)
            .await
            .context("Failed to get enrollments")?;

        let now = Utc::now();
        let records: Vec<AssignmentRecord> = enrollments
            .iter()
            .filter(|e| e.receives_assignments())
            .map(|e| AssignmentRecord::assign(&item, &item_id, &e.student_id, now))
            .collect();

        if !records.is_empty() {
            self.assignments
                .put_many(&records)
                .await
                .context("Failed to create assignments")?;
        }

        info!(
            course_id = %item.course_id,
            item_id = %item_id,
            assigned = records.len(),
            "課題配布"
        );
        Ok(ApiResponse::ok_value(json!({
            "itemId": item_id,
            "assignedCount": records.len(),
        })))
    }

    async fn course_summary(
        &self,
        request: &ApiRequest,
        course_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        request.require_role(GRADERS)?;

        let records = self
            .assignments
            .list_by_course(course_id)
            .await
            .context("Failed to get course assignments")?;
        ApiResponse::ok(&summarize_course(&records))
    }

    async fn grade(
        &self,
        request: &ApiRequest,
        course_id: &str,
        student_id: &str,
        item_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        request.require_role(GRADERS)?;
        let body: GradeRequest = request.json_body()?;
        let score = body
            .score
            .ok_or_else(|| HandlerError::bad_request("score is required"))?;

        let mut record = self.find(course_id, student_id, item_id).await?;
        record
            .grade(score, body.feedback, request.claims().sub.clone(), Utc::now())
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;

        self.assignments
            .put(&record)
            .await
            .context("Failed to grade assignment")?;

        info!(
            course_id = course_id,
            student_id = student_id,
            item_id = item_id,
            score = score,
            "採点"
        );
        ApiResponse::ok(&record)
    }

    async fn student_assignments(
        &self,
        request: &ApiRequest,
        student_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        require_own_record(request, student_id)?;

        let records = self
            .assignments
            .list_by_student(student_id)
            .await
            .context("Failed to get student assignments")?;
        ApiResponse::ok(&group_for_student(records, Utc::now()))
    }

    async fn submit(
        &self,
        request: &ApiRequest,
        student_id: &str,
        course_id: &str,
        item_id: &str,
    ) -> Result<ApiResponse, HandlerError> {
        require_own_record(request, student_id)?;
        let body: SubmitRequest = request.json_body()?;

        let now = Utc::now();
        let uploaded_at = format_timestamp(now);
        let files = body
            .files
            .into_iter()
            .map(|mut file| {
                if file.upload_date.is_empty() {
                    file.upload_date = uploaded_at.clone();
                }
                file
            })
            .collect();

        let mut record = self.find(course_id, student_id, item_id).await?;
        record
            .submit(body.comment, files, now)
            .map_err(|e| HandlerError::bad_request(e.to_string()))?;

        self.assignments
            .put(&record)
            .await
            .context("Failed to submit assignment")?;

        info!(
            course_id = course_id,
            student_id = student_id,
            item_id = item_id,
            late = record.is_late(),
            "課題提出"
        );
        ApiResponse::ok(&record)
    }

    async fn find(
        &self,
        course_id: &str,
        student_id: &str,
        item_id: &str,
    ) -> Result<AssignmentRecord, HandlerError> {
        self.assignments
            .get(course_id, student_id, item_id)
            .await
            .context("Failed to get assignment")?
            .ok_or_else(|| HandlerError::not_found("Assignment not found"))
    }
}

/// 受講生は自分のレコードにのみアクセスできる
fn require_own_record(request: &ApiRequest, student_id: &str) -> Result<(), HandlerError> {
    let role = request.require_role(ALL_ROLES)?;
    if role == Role::Student && request.claims().sub.as_deref() != Some(student_id) {
        return Err(HandlerError::Forbidden(
            "Students can only access their own assignments".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl<AR, ER> RequestHandler for AssignmentHandler<AR, ER>
where
    AR: AssignmentRepository,
    ER: EnrollmentRepository,
{
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError> {
        let path = request.path();
        match *request.method() {
            Method::POST if match_path("/admin/assignments", path).is_some() => {
                self.assign(request).await
            }
            Method::POST => match match_path(
                "/students/{studentId}/assignments/{courseId}/{itemId}/submit",
                path,
            ) {
                Some(p) => self.submit(request, p[0], p[1], p[2]).await,
                None => Err(HandlerError::route_not_found()),
            },
            Method::GET => {
                if let Some(p) = match_path("/admin/assignments/course/{courseId}", path) {
                    self.course_summary(request, p[0]).await
                } else if let Some(p) = match_path("/students/{studentId}/assignments", path) {
                    self.student_assignments(request, p[0]).await
                } else {
                    Err(HandlerError::route_not_found())
                }
            }
            Method::PUT => match match_path(
                "/admin/assignments/{courseId}/{studentId}/{itemId}/grade",
                path,
            ) {
                Some(p) => self.grade(request, p[0], p[1], p[2]).await,
                None => Err(HandlerError::route_not_found()),
            },
            _ => Err(HandlerError::route_not_found()),
        }
    }
}
