/// お知らせLambda
///
/// 作成と削除は管理者のみ、一覧と取得は誰でも可能。
/// 環境変数: BUCKET_NAME
use lambda_http::{Body, Error, Request, Response, run, service_fn};
use lms_api::application::{NoticeHandler, configuration_error, dispatch};
use lms_api::infrastructure::config::BUCKET_NAME_VAR;
use lms_api::infrastructure::{BucketConfig, ConfigError, S3ObjectStore, init_logging, load_aws_config};
use tokio::sync::OnceCell;

static HANDLER: OnceCell<NoticeHandler<S3ObjectStore>> = OnceCell::const_new();

async fn get_handler() -> Result<&'static NoticeHandler<S3ObjectStore>, ConfigError> {
    HANDLER
        .get_or_try_init(|| async {
            let bucket = BucketConfig::from_env(BUCKET_NAME_VAR)?;
            let sdk_config = load_aws_config().await;
            let client = aws_sdk_s3::Client::new(&sdk_config);
            Ok(NoticeHandler::new(S3ObjectStore::new(client, bucket)))
        })
        .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    run(service_fn(handler)).await
}

async fn handler(request: Request) -> Result<Response<Body>, Error> {
    let response = match get_handler().await {
        Ok(h) => dispatch(h, &request).await,
        Err(err) => configuration_error(&err),
    };
    Ok(response.into_http_response())
}
