// ハンドラーのエラー型
//
// 各バリアントはHTTPステータスに1対1で対応する。

use std::fmt::Display;

use http::StatusCode;
use thiserror::Error;

use crate::domain::Role;
use crate::infrastructure::{ObjectStoreError, RepositoryError};

/// リクエスト処理のエラー
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HandlerError {
    /// 400: 入力不備
    #[error("{0}")]
    BadRequest(String),

    /// 403: ロール不一致
    #[error("{0}")]
    Forbidden(String),

    /// 404: 対象が存在しない
    #[error("{0}")]
    NotFound(String),

    /// 405: 未対応のメソッド
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// 500: 内部エラー（`context`は短い説明、`message`は元のエラー）
    #[error("{context}: {message}")]
    Internal { context: String, message: String },
}

impl HandlerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        HandlerError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HandlerError::NotFound(message.into())
    }

    /// ルートに一致しなかった場合の404
    pub fn route_not_found() -> Self {
        HandlerError::NotFound("Not Found".to_string())
    }

    /// 許可ロールに含まれない場合の403
    ///
    /// メッセージは`Unauthorized: Admin access required`、
    /// 複数ロールなら`Unauthorized: Admin or Instructor access required`。
    pub fn unauthorized(allowed: &[Role]) -> Self {
        let roles: Vec<&str> = allowed.iter().map(Role::display_name).collect();
        HandlerError::Forbidden(format!(
            "Unauthorized: {} access required",
            roles.join(" or ")
        ))
    }

    pub fn internal(context: impl Into<String>, error: impl Display) -> Self {
        HandlerError::Internal {
            context: context.into(),
            message: error.to_string(),
        }
    }

    /// レスポンスのステータスコード
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HandlerError::Forbidden(_) => StatusCode::FORBIDDEN,
            HandlerError::NotFound(_) => StatusCode::NOT_FOUND,
            HandlerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HandlerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// アクセサーのエラーに文脈を付けてHandlerErrorへ変換する
pub trait ErrorContext<T> {
    fn context(self, context: &str) -> Result<T, HandlerError>;
}

impl<T> ErrorContext<T> for Result<T, RepositoryError> {
    fn context(self, context: &str) -> Result<T, HandlerError> {
        self.map_err(|e| HandlerError::internal(context, e))
    }
}

impl<T> ErrorContext<T> for Result<T, ObjectStoreError> {
    fn context(self, context: &str) -> Result<T, HandlerError> {
        self.map_err(|e| HandlerError::internal(context, e))
    }
}
