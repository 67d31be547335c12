/// 講義テーブルへのアクセス
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};

use crate::domain::course::CATEGORY_INDEX_NAME;
use crate::domain::{CourseRecord, CourseUpdate};
use crate::infrastructure::repository::{
    RepositoryError, from_dynamo_item, from_dynamo_items, query_all, scan_all, set_expression,
    to_dynamo_item,
};

/// 講義管理用トレイト
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// 講義を保存（上書き）
    async fn put(&self, course: &CourseRecord) -> Result<(), RepositoryError>;

    /// IDで講義を取得
    async fn get(&self, course_id: &str) -> Result<Option<CourseRecord>, RepositoryError>;

    /// 大分類の講義を作成日時の新しい順に取得（小分類指定時は絞り込み）
    async fn query_by_category(
        &self,
        main_category: &str,
        sub_category: Option<&str>,
    ) -> Result<Vec<CourseRecord>, RepositoryError>;

    /// 全講義
    async fn scan_all(&self) -> Result<Vec<CourseRecord>, RepositoryError>;

    /// 指定フィールドと`updatedAt`を更新して更新後のレコードを返す
    ///
    /// 講義が存在しない場合は`Ok(None)`
    async fn update(
        &self,
        course_id: &str,
        update: &CourseUpdate,
        updated_at: &str,
    ) -> Result<Option<CourseRecord>, RepositoryError>;

    /// 講義を削除して削除前のレコードを返す
    async fn delete(&self, course_id: &str) -> Result<Option<CourseRecord>, RepositoryError>;
}

/// CourseRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoCourseRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoCourseRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl CourseRepository for DynamoCourseRepository {
    async fn put(&self, course: &CourseRecord) -> Result<(), RepositoryError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_dynamo_item(course)?))
            .send()
            .await
            .map_err(|e| RepositoryError::WriteError(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, course_id: &str) -> Result<Option<CourseRecord>, RepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(course_id.to_string()))
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.to_string()))?;

        output.item.map(from_dynamo_item).transpose()
    }

    async fn query_by_category(
        &self,
        main_category: &str,
        sub_category: Option<&str>,
    ) -> Result<Vec<CourseRecord>, RepositoryError> {
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(CATEGORY_INDEX_NAME)
            .key_condition_expression("mainCategory = :mainCategory")
            .expression_attribute_values(
                ":mainCategory",
                AttributeValue::S(main_category.to_string()),
            )
            .scan_index_forward(false);

        if let Some(sub_category) = sub_category {
            request = request
                .filter_expression("subCategory = :subCategory")
                .expression_attribute_values(
                    ":subCategory",
                    AttributeValue::S(sub_category.to_string()),
                );
        }

        from_dynamo_items(query_all(request).await?)
    }

    async fn scan_all(&self) -> Result<Vec<CourseRecord>, RepositoryError> {
        let request = self.client.scan().table_name(&self.table_name);
        from_dynamo_items(scan_all(request).await?)
    }

    async fn update(
        &self,
        course_id: &str,
        update: &CourseUpdate,
        updated_at: &str,
    ) -> Result<Option<CourseRecord>, RepositoryError> {
        let mut attributes = to_dynamo_item(update)?;
        attributes.insert(
            "updatedAt".to_string(),
            AttributeValue::S(updated_at.to_string()),
        );
        let set = set_expression(attributes);

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(course_id.to_string()))
            .update_expression(set.expression)
            .condition_expression("attribute_exists(id)")
            .set_expression_attribute_names(Some(set.names))
            .set_expression_attribute_values(Some(set.values))
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

    async fn delete(&self, course_id: &str) -> Result<Option<CourseRecord>, RepositoryError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(course_id.to_string()))
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
