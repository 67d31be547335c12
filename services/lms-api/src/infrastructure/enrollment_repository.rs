/// 受講登録テーブルへのアクセス
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};

use crate::domain::enrollment::STUDENT_INDEX_NAME;
use crate::domain::{EnrollmentRecord, EnrollmentStatus};
use crate::infrastructure::repository::{
    RepositoryError, from_dynamo_item, from_dynamo_items, query_all, to_dynamo_item,
};

/// 受講登録管理用トレイト
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// 受講登録を保存（上書き）
    async fn put(&self, enrollment: &EnrollmentRecord) -> Result<(), RepositoryError>;

    /// 講義の受講登録一覧
    async fn list_by_course(&self, course_id: &str)
    -> Result<Vec<EnrollmentRecord>, RepositoryError>;

    /// 受講生の受講登録一覧（`student_id-index`を使用）
    async fn list_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<EnrollmentRecord>, RepositoryError>;

    /// 状態を変更して更新後のレコードを返す（存在しない場合は`Ok(None)`）
    async fn update_status(
        &self,
        course_id: &str,
        student_id: &str,
        status: EnrollmentStatus,
        updated_at: &str,
    ) -> Result<Option<EnrollmentRecord>, RepositoryError>;

    /// 受講登録を削除して削除前のレコードを返す
    async fn delete(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<Option<EnrollmentRecord>, RepositoryError>;
}

/// EnrollmentRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoEnrollmentRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoEnrollmentRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl EnrollmentRepository for DynamoEnrollmentRepository {
    async fn put(&self, enrollment: &EnrollmentRecord) -> Result<(), RepositoryError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_dynamo_item(enrollment)?))
            .send()
            .await
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        Ok(())
    }

    async fn list_by_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<EnrollmentRecord>, RepositoryError> {
        let request = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("course_id = :cid")
            .expression_attribute_values(":cid", AttributeValue::S(course_id.to_string()));

        from_dynamo_items(query_all(request).await?)
    }

    async fn list_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<EnrollmentRecord>, RepositoryError> {
        let request = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(STUDENT_INDEX_NAME)
            .key_condition_expression("student_id = :sid")
            .expression_attribute_values(":sid", AttributeValue::S(student_id.to_string()));

        from_dynamo_items(query_all(request).await?)
    }

    async fn update_status(
        &self,
        course_id: &str,
        student_id: &str,
        status: EnrollmentStatus,
        updated_at: &str,
    ) -> Result<Option<EnrollmentRecord>, RepositoryError> {
        let status: AttributeValue = serde_dynamo::to_attribute_value(status)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("course_id", AttributeValue::S(course_id.to_string()))
            .key("student_id", AttributeValue::S(student_id.to_string()))
            .update_expression("SET #status = :status, updated_at = :updated_at")
            .condition_expression("attribute_exists(course_id)")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":status", status)
            .expression_attribute_values(":updated_at", AttributeValue::S(updated_at.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes.map(from_dynamo_item).transpose(),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    return Ok(None);
                }
                Err(RepositoryError::WriteError(service_error.to_string()))
            }
        }
    }

    async fn delete(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<Option<EnrollmentRecord>, RepositoryError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("course_id", AttributeValue::S(course_id.to_string()))
            .key("student_id", AttributeValue::S(student_id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        output
            .attributes
            .filter(|attributes| !attributes.is_empty())
            .map(from_dynamo_item)
            .transpose()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// ユニットテスト用のモックEnrollmentRepository
    #[derive(Debug, Clone)]
    pub struct MockEnrollmentRepository {
        /// 保存された受講登録: (course_id, student_id) -> EnrollmentRecord
        enrollments: Arc<Mutex<BTreeMap<(String, String), EnrollmentRecord>>>,
        /// 次の操作で返すエラー（エラーパスのテスト用）
        next_error: Arc<Mutex<Option<RepositoryError>>>,
    }

    impl MockEnrollmentRepository {
        pub fn new() -> Self {
            Self {
                enrollments: Arc::new(Mutex::new(BTreeMap::new())),
                next_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn set_next_error(&self, error: RepositoryError) {
            *self.next_error.lock().unwrap() = Some(error);
        }

        pub fn insert(&self, course_id: &str, student_id: &str, status: EnrollmentStatus) {
            let record = EnrollmentRecord {
                course_id: course_id.to_string(),
                student_id: student_id.to_string(),
                status,
                enrolled_at: "2024-01-01T00:00:00.000Z".to_string(),
                updated_at: "2024-01-01T00:00:00.000Z".to_string(),
            };
            self.enrollments
                .lock()
                .unwrap()
                .insert((course_id.to_string(), student_id.to_string()), record);
        }

        pub fn get_enrollment(&self, course_id: &str, student_id: &str) -> Option<EnrollmentRecord> {
            self.enrollments
                .lock()
                .unwrap()
                .get(&(course_id.to_string(), student_id.to_string()))
                .cloned()
        }

        pub fn enrollment_count(&self) -> usize {
            self.enrollments.lock().unwrap().len()
        }

        fn take_error(&self) -> Option<RepositoryError> {
            self.next_error.lock().unwrap().take()
        }
    }

    #[async_trait]
    impl EnrollmentRepository for MockEnrollmentRepository {
        async fn put(&self, enrollment: &EnrollmentRecord) -> Result<(), RepositoryError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            self.enrollments.lock().unwrap().insert(
                (enrollment.course_id.clone(), enrollment.student_id.clone()),
                enrollment.clone(),
            );
            Ok(())
        }

        async fn list_by_course(
            &self,
            course_id: &str,
        ) -> Result<Vec<EnrollmentRecord>, RepositoryError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .enrollments
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.course_id == course_id)
                .cloned()
                .collect())
        }

        async fn list_by_student(
            &self,
            student_id: &str,
        ) -> Result<Vec<EnrollmentRecord>, RepositoryError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .enrollments
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.student_id == student_id)
                .cloned()
                .collect())
        }

        async fn update_status(
            &self,
            course_id: &str,
            student_id: &str,
            status: EnrollmentStatus,
            updated_at: &str,
        ) -> Result<Option<EnrollmentRecord>, RepositoryError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            let mut enrollments = self.enrollments.lock().unwrap();
            Ok(enrollments
                .get_mut(&(course_id.to_string(), student_id.to_string()))
                .map(|record| {
                    record.status = status;
                    record.updated_at = updated_at.to_string();
                    record.clone()
                }))
        }

        async fn delete(
            &self,
            course_id: &str,
            student_id: &str,
        ) -> Result<Option<EnrollmentRecord>, RepositoryError> {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
            Ok(self
                .enrollments
                .lock()
                .unwrap()
                .remove(&(course_id.to_string(), student_id.to_string())))
        }
    }

    #[test]
    fn test_enrollment_item_attributes() {
        let record = EnrollmentRecord {
            course_id: "c-1".to_string(),
            student_id: "s-1".to_string(),
            status: EnrollmentStatus::Active,
            enrolled_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-02T00:00:00.000Z".to_string(),
        };

        let item = to_dynamo_item(&record).unwrap();

        assert_eq!(item.get("course_id"), Some(&AttributeValue::S("c-1".to_string())));
        assert_eq!(item.get("status"), Some(&AttributeValue::S("ACTIVE".to_string())));
    }

    #[test]
    fn test_status_attribute_value() {
        let value: AttributeValue =
            serde_dynamo::to_attribute_value(EnrollmentStatus::Dropped).unwrap();
        assert_eq!(value, AttributeValue::S("DROPPED".to_string()));
    }
}
