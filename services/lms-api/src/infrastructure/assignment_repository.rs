/// 課題テーブルへのアクセス
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};

use crate::domain::AssignmentRecord;
use crate::domain::assignment::student_item_key;
use crate::domain::enrollment::STUDENT_INDEX_NAME;
use crate::infrastructure::repository::{
    RepositoryError, from_dynamo_item, from_dynamo_items, query_all, to_dynamo_item,
};

/// BatchWriteItemは1回最大25件まで
const BATCH_SIZE: usize = 25;

/// 課題管理用トレイト
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// 課題レコードを保存（上書き）
    async fn put(&self, record: &AssignmentRecord) -> Result<(), RepositoryError>;

    /// 複数の課題レコードを保存
    async fn put_many(&self, records: &[AssignmentRecord]) -> Result<(), RepositoryError>;

    /// 1件取得
    async fn get(
        &self,
        course_id: &str,
        student_id: &str,
        item_id: &str,
    ) -> Result<Option<AssignmentRecord>, RepositoryError>;

    /// 講義の全課題レコード
    async fn list_by_course(&self, course_id: &str)
    -> Result<Vec<AssignmentRecord>, RepositoryError>;

    /// 受講生の全課題レコード（`student_id-index`を使用）
    async fn list_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AssignmentRecord>, RepositoryError>;
}

/// AssignmentRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoAssignmentRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoAssignmentRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl AssignmentRepository for DynamoAssignmentRepository {
    async fn put(&self, record: &AssignmentRecord) -> Result<(), RepositoryError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_dynamo_item(record)?))
            .send()
            .await
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        Ok(())
    }

    async fn put_many(&self, records: &[AssignmentRecord]) -> Result<(), RepositoryError> {
        let mut write_requests = Vec::with_capacity(records.len());
        for record in records {
            let put_request = PutRequest::builder()
                .set_item(Some(to_dynamo_item(record)?))
                .build()
                .map_err(|e| RepositoryError::WriteError(e.to_string()))?;
            write_requests.push(WriteRequest::builder().put_request(put_request).build());
        }

        for chunk in write_requests.chunks(BATCH_SIZE) {
            let output = self
                .client
                .batch_write_item()
                .request_items(&self.table_name, chunk.to_vec())
                .send()
                .await
                .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

            let unprocessed = output
                .unprocessed_items
                .as_ref()
                .and_then(|items| items.get(&self.table_name))
                .map_or(0, Vec::len);
            if unprocessed > 0 {
                return Err(RepositoryError::WriteError(format!(
                    "{unprocessed} items were not processed"
                )));
            }
        }

        Ok(())
    }

    async fn get(
        &self,
        course_id: &str,
        student_id: &str,
        item_id: &str,
    ) -> Result<Option<AssignmentRecord>, RepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("course_id", AttributeValue::S(course_id.to_string()))
            .key(
                "student_item",
                AttributeValue::S(student_item_key(student_id, item_id)),
            )
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.to_string()))?;

        output.item.map(from_dynamo_item).transpose()
    }

    async fn list_by_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<AssignmentRecord>, RepositoryError> {
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
    ) -> Result<Vec<AssignmentRecord>, RepositoryError> {
        let request = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(STUDENT_INDEX_NAME)
            .key_condition_expression("student_id = :sid")
            .expression_attribute_values(":sid", AttributeValue::S(student_id.to_string()));

        from_dynamo_items(query_all(request).await?)
    }
}
