/// ユーザーレコード
///
/// ユーザーテーブル（パーティションキー`id`）の1アイテムに対応する。
/// 属性名はsnake_case。
use serde::{Deserialize, Serialize};

use crate::domain::Role;

/// ユーザーテーブルのGSI名（パーティションキー`role`）
pub const ROLE_INDEX_NAME: &str = "role-index";

/// ユーザー情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// ユーザーID（Cognitoのsub）
    pub id: String,
    /// メールアドレス
    #[serde(default)]
    pub email: String,
    /// 表示名
    #[serde(default)]
    pub name: String,
    /// ロール
    pub role: Role,
    /// 作成日時
    #[serde(default)]
    pub created_at: String,
    /// 更新日時
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
