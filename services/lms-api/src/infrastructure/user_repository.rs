/// ユーザーテーブルへのアクセス
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};

use crate::domain::user::ROLE_INDEX_NAME;
use crate::domain::{Role, UserRecord};
use crate::infrastructure::repository::{
    RepositoryError, from_dynamo_item, from_dynamo_items, query_all, scan_all,
};

/// ユーザー管理用トレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ロールで絞り込んだユーザー一覧（`role-index`を使用）
    async fn list_by_role(&self, role: Role) -> Result<Vec<UserRecord>, RepositoryError>;

    /// 全件スキャン（`role`指定時はフィルタ付き）
    async fn scan(&self, role: Option<Role>) -> Result<Vec<UserRecord>, RepositoryError>;

    /// ロールを変更して更新後のレコードを返す
    ///
    /// ユーザーが存在しない場合は`Ok(None)`
    async fn update_role(
        &self,
        user_id: &str,
        role: Role,
        updated_at: &str,
    ) -> Result<Option<UserRecord>, RepositoryError>;

    /// ユーザーを削除して削除前のレコードを返す
    ///
    /// ユーザーが存在しない場合は`Ok(None)`
    async fn delete(&self, user_id: &str) -> Result<Option<UserRecord>, RepositoryError>;
}

/// UserRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoUserRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoUserRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl UserRepository for DynamoUserRepository {
    async fn list_by_role(&self, role: Role) -> Result<Vec<UserRecord>, RepositoryError> {
        let request = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(ROLE_INDEX_NAME)
            .key_condition_expression("#role = :role")
            .expression_attribute_names("#role", "role")
            .expression_attribute_values(":role", AttributeValue::S(role.to_string()));

        from_dynamo_items(query_all(request).await?)
    }

    async fn scan(&self, role: Option<Role>) -> Result<Vec<UserRecord>, RepositoryError> {
        let mut request = self.client.scan().table_name(&self.table_name);
        if let Some(role) = role {
            request = request
                .filter_expression("#role = :role")
                .expression_attribute_names("#role", "role")
                .expression_attribute_values(":role", AttributeValue::S(role.to_string()));
        }

        from_dynamo_items(scan_all(request).await?)
    }

    async fn update_role(
        &self,
        user_id: &str,
        role: Role,
        updated_at: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(user_id.to_string()))
            .update_expression("SET #role = :role, updated_at = :updated_at")
            .condition_expression("attribute_exists(id)")
            .expression_attribute_names("#role", "role")
            .expression_attribute_values(":role", AttributeValue::S(role.to_string()))
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

    async fn delete(&self, user_id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(user_id.to_string()))
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
