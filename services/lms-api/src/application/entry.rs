// エントリーハンドラー
//
// イベント解析 → OPTIONS応答 → 各ハンドラーへの委譲 → エラー変換までを共通化する。

use async_trait::async_trait;
use http::Method;
use lambda_http::Request;
use tracing::{error, info, warn};

use crate::application::error::HandlerError;
use crate::application::request::ApiRequest;
use crate::application::response::ApiResponse;

/// Lambda関数ごとのリクエストハンドラー
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// メソッドとパスで処理を振り分ける
    async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, HandlerError>;
}

/// リクエストを処理してレスポンスを返す
pub async fn dispatch<H>(handler: &H, request: &Request) -> ApiResponse
where
    H: RequestHandler + ?Sized,
{
    let request = match ApiRequest::from_http(request) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "リクエスト解析失敗");
            return ApiResponse::from_error(&HandlerError::bad_request(err.to_string()));
        }
    };

    info!(
        method = %request.method(),
        path = request.path(),
        user_id = request.claims().sub.as_deref().unwrap_or("anonymous"),
        role = request.claims().role.as_deref().unwrap_or("none"),
        "リクエスト受信"
    );

    if request.method() == Method::OPTIONS {
        return ApiResponse::preflight();
    }

    match handler.handle(&request).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                HandlerError::Internal { .. } => {
                    error!(method = %request.method(), path = request.path(), error = %err, "リクエスト処理失敗");
                }
                _ => {
                    warn!(
                        method = %request.method(),
                        path = request.path(),
                        status = err.status().as_u16(),
                        error = %err,
                        "リクエスト拒否"
                    );
                }
            }
            ApiResponse::from_error(&err)
        }
    }
}

/// 設定読み込みに失敗した場合のレスポンス
pub fn configuration_error(err: &impl std::fmt::Display) -> ApiResponse {
    error!(error = %err, "設定読み込み失敗");
    ApiResponse::from_error(&HandlerError::internal("Configuration error", err))
}
