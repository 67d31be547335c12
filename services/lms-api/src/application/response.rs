// レスポンスの組み立て
//
// すべてのレスポンスは`{success, data?, error?, message?}`の共通形式で、
// CORSヘッダーを付けてlambda_httpのResponseに変換する。

use http::StatusCode;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, HeaderMap, HeaderValue,
};
use lambda_http::{Body, Response};
use serde::Serialize;
use serde_json::Value;

use crate::application::error::HandlerError;

/// 共通レスポンス形式
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// ハンドラーのレスポンス
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    envelope: Envelope,
}

impl ApiResponse {
    /// 200 成功（`data`付き）
    pub fn ok<T: Serialize>(data: &T) -> Result<Self, HandlerError> {
        let data = serde_json::to_value(data)
            .map_err(|e| HandlerError::internal("Failed to serialize response", e))?;
        Ok(Self::ok_value(data))
    }

    pub fn ok_value(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                data: Some(data),
                error: None,
                message: None,
            },
        }
    }

    /// 200 成功（`message`のみ）
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                data: None,
                error: None,
                message: Some(message.into()),
            },
        }
    }

    /// OPTIONSプリフライトへの応答
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope {
                success: true,
                data: None,
                error: None,
                message: None,
            },
        }
    }

    /// エラーレスポンス
    pub fn from_error(error: &HandlerError) -> Self {
        let (error_text, message) = match error {
            HandlerError::Internal { context, message } => (context.clone(), Some(message.clone())),
            other => (other.to_string(), None),
        };

        Self {
            status: error.status(),
            envelope: Envelope {
                success: false,
                data: None,
                error: Some(error_text),
                message,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// `data`への参照（テストや後処理用）
    pub fn data(&self) -> Option<&Value> {
        self.envelope.data.as_ref()
    }

    /// lambda_httpのレスポンスに変換（CORSヘッダー付き）
    pub fn into_http_response(self) -> Response<Body> {
        // Envelopeは文字列とJSON値のみを持つためシリアライズは失敗しない
        let body = serde_json::to_string(&self.envelope).unwrap_or_else(|_| {
            r#"{"success":false,"error":"Failed to serialize response"}"#.to_string()
        });

        let mut response = Response::new(Body::Text(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = build_cors_headers();
        response
    }
}

/// CORSヘッダーを生成
///
/// - Content-Type: application/json
/// - Access-Control-Allow-Origin: *
/// - Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS
/// - Access-Control-Allow-Headers: Content-Type,Authorization
pub fn build_cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type,Authorization"),
    );

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_of(response: &Response<Body>) -> Value {
        match response.body() {
            Body::Text(text) => serde_json::from_str(text).unwrap(),
            other => panic!("予期しないBody型: {other:?}"),
        }
    }

    #[test]
    fn test_ok_response() {
        let response = ApiResponse::ok(&json!({"courses": [], "count": 0})).unwrap();
        let response = response.into_http_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_of(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["count"], 0);
        assert!(body.get("error").is_none());
    }

    #[test]
    fn test_cors_headers_on_every_response() {
        let response = ApiResponse::from_error(&HandlerError::route_not_found()).into_http_response();
        let headers = response.headers();

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "Content-Type,Authorization"
        );
    }

    #[test]
    fn test_error_responses() {
        let response = ApiResponse::from_error(&HandlerError::bad_request(
            "Role parameter is required",
        ))
        .into_http_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(&response);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Role parameter is required");
        assert!(body.get("message").is_none());

        let response = ApiResponse::from_error(&HandlerError::MethodNotAllowed).into_http_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_of(&response)["error"], "Method not allowed");
    }

    #[test]
    fn test_internal_error_carries_message() {
        let error = HandlerError::internal("Failed to list posts", "access denied");
        let response = ApiResponse::from_error(&error).into_http_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(&response);
        assert_eq!(body["error"], "Failed to list posts");
        assert_eq!(body["message"], "access denied");
    }

    #[test]
    fn test_message_and_preflight() {
        let body = body_of(&ApiResponse::message("Course deleted").into_http_response());
        assert_eq!(body, json!({"success": true, "message": "Course deleted"}));

        let response = ApiResponse::preflight().into_http_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(&response), json!({"success": true}));
    }
}
