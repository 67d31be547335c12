/// DynamoDBリポジトリ共通のエラー型と変換ヘルパー
///
/// レコードとアイテムの相互変換はserde_dynamoで行う。
use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder;
use aws_sdk_dynamodb::operation::scan::builders::ScanFluentBuilder;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// DynamoDBのアイテム
pub type DynamoItem = HashMap<String, AttributeValue>;

/// リポジトリ操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// DynamoDBへの接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// DynamoDBへの書き込みに失敗
    #[error("Write error: {0}")]
    WriteError(String),

    /// DynamoDBからの読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),

    /// データのシリアライズ/デシリアライズに失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// レコードをアイテムに変換
pub fn to_dynamo_item<T: Serialize>(value: &T) -> Result<DynamoItem, RepositoryError> {
    serde_dynamo::to_item(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

/// アイテムをレコードに変換
pub fn from_dynamo_item<T: DeserializeOwned>(item: DynamoItem) -> Result<T, RepositoryError> {
    serde_dynamo::from_item(item).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

/// 複数アイテムをレコードに変換
pub fn from_dynamo_items<T: DeserializeOwned>(
    items: Vec<DynamoItem>,
) -> Result<Vec<T>, RepositoryError> {
    items.into_iter().map(from_dynamo_item).collect()
}

/// Queryを最後のページまで実行
pub async fn query_all(request: QueryFluentBuilder) -> Result<Vec<DynamoItem>, RepositoryError> {
    let mut items = Vec::new();
    let mut start_key: Option<DynamoItem> = None;

    loop {
        let output = request
            .clone()
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.to_string()))?;

        items.extend(output.items.unwrap_or_default());

        match output.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    Ok(items)
}

/// Scanを最後のページまで実行
pub async fn scan_all(request: ScanFluentBuilder) -> Result<Vec<DynamoItem>, RepositoryError> {
    let mut items = Vec::new();
    let mut start_key: Option<DynamoItem> = None;

    loop {
        let output = request
            .clone()
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.to_string()))?;

        items.extend(output.items.unwrap_or_default());

        match output.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    Ok(items)
}

/// UpdateItem用のSET式
#[derive(Debug, Clone, PartialEq)]
pub struct SetExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// 属性一覧から`SET #a0 = :a0, #a1 = :a1, ...`形式の更新式を組み立てる
///
/// 予約語との衝突を避けるため属性名はすべてプレースホルダーにする。
/// 属性は名前順に並べる。
pub fn set_expression(attributes: DynamoItem) -> SetExpression {
    let sorted: BTreeMap<String, AttributeValue> = attributes.into_iter().collect();
    let mut assignments = Vec::with_capacity(sorted.len());
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    for (index, (name, value)) in sorted.into_iter().enumerate() {
        let name_placeholder = format!("#a{index}");
        let value_placeholder = format!(":a{index}");
        assignments.push(format!("{name_placeholder} = {value_placeholder}"));
        names.insert(name_placeholder, name);
        values.insert(value_placeholder, value);
    }

    SetExpression {
        expression: format!("SET {}", assignments.join(", ")),
        names,
        values,
    }
}
