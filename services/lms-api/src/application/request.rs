// HTTPリクエストの解析
//
// lambda_httpが変換したRequestから、ハンドラーが使う値だけを取り出す。
// 認可はAPI Gateway側のオーソライザーで済んでおり、ここではクレームを読むだけ。

use std::collections::HashMap;

use http::Method;
use lambda_http::request::RequestContext;
use lambda_http::{Request, RequestExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::application::error::HandlerError;
use crate::domain::Role;

/// ロールのカスタムクレーム名
const ROLE_CLAIM: &str = "custom:role";

/// リクエスト解析のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid request body encoding: {0}")]
    InvalidBody(String),
}

/// トークンのクレーム
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Claims {
    /// ユーザーID
    pub sub: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    /// `custom:role`の生の値
    pub role: Option<String>,
}

impl Claims {
    /// リクエストコンテキストのオーソライザーから読む
    ///
    /// HTTP APIのJWTオーソライザーは`jwt.claims`、
    /// REST APIのCognitoオーソライザーは`claims`に入る。
    fn from_context(context: Option<&RequestContext>) -> Self {
        let authorizer = match context {
            Some(RequestContext::ApiGatewayV2(ctx)) => serde_json::to_value(&ctx.authorizer).ok(),
            Some(RequestContext::ApiGatewayV1(ctx)) => serde_json::to_value(&ctx.authorizer).ok(),
            _ => None,
        };
        Self::from_authorizer(authorizer.as_ref())
    }

    fn from_authorizer(authorizer: Option<&Value>) -> Self {
        let claims = authorizer.and_then(|a| {
            a.get("jwt")
                .and_then(|jwt| jwt.get("claims"))
                .or_else(|| a.get("claims"))
                .or_else(|| a.get("lambda").and_then(|l| l.get("claims")))
                .filter(|c| c.is_object())
        });
        let claim = |name: &str| {
            claims
                .and_then(|c| c.get(name))
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            sub: claim("sub"),
            email: claim("email"),
            name: claim("name"),
            role: claim(ROLE_CLAIM),
        }
    }

    /// ロールクレーム（未知の値は`None`）
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

/// 解析済みのHTTPリクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    body: Option<String>,
    claims: Claims,
}

impl ApiRequest {
    /// lambda_httpのRequestから作成
    pub fn from_http(request: &Request) -> Result<Self, RequestError> {
        // URIのパスはパーセントエンコードされたまま
        let raw_path = match request.raw_http_path() {
            "" => request.uri().path(),
            raw => raw,
        };
        let path = urlencoding::decode(raw_path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());

        let query = request
            .query_string_parameters_ref()
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let body = match std::str::from_utf8(request.body().as_ref()) {
            Ok("") => None,
            Ok(body) => Some(body.to_string()),
            Err(e) => return Err(RequestError::InvalidBody(e.to_string())),
        };

        Ok(Self {
            method: request.method().clone(),
            path: normalize_path(&path),
            query,
            body,
            claims: Claims::from_context(request.request_context_ref()),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 正規化済みパス（先頭`/`あり、末尾`/`なし）
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// クエリパラメーター（空文字は未指定扱い）
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// 呼び出し元のロールが許可ロールに含まれることを確認
    pub fn require_role(&self, allowed: &[Role]) -> Result<Role, HandlerError> {
        match self.claims.role() {
            Some(role) if allowed.contains(&role) => Ok(role),
            _ => Err(HandlerError::unauthorized(allowed)),
        }
    }

    /// ボディをJSONとしてデシリアライズ
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let body = self
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| HandlerError::bad_request("Request body is required"))?;
        serde_json::from_str(body)
            .map_err(|e| HandlerError::bad_request(format!("Invalid request body: {e}")))
    }
}

/// 末尾の`/`を取り除き、先頭に`/`を付ける
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// テスト用のリクエスト組み立て
#[cfg(test)]
impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
            query: HashMap::new(),
            body: None,
            claims: Claims::default(),
        }
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn with_raw_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.claims.role = Some(role.to_string());
        self
    }

    pub fn with_user(mut self, sub: &str) -> Self {
        self.claims.sub = Some(sub.to_string());
        self.claims.email = Some(format!("{sub}@example.com"));
        self
    }
}
