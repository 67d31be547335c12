/// 講義管理Lambda
///
/// 講義の作成・検索・更新・削除と、講義ファイルの署名付きURL発行を処理する。
///
/// 環境変数:
/// - BUCKET_NAME: 講義ファイルのバケット
/// - COURSE_TABLE_NAME: 講義テーブル
/// - PRESIGNED_URL_EXPIRES_SECONDS: 署名付きURLの有効期限（任意）
use lambda_http::{Body, Error, Request, Response, run, service_fn};
use lms_api::application::{CourseHandler, configuration_error, dispatch};
use lms_api::infrastructure::config::{BUCKET_NAME_VAR, COURSE_TABLE_VAR};
use lms_api::infrastructure::{
    BucketConfig, ConfigError, DynamoCourseRepository, S3ObjectStore, init_logging,
    load_aws_config, required_env,
};
use tokio::sync::OnceCell;

type Handler = CourseHandler<S3ObjectStore, DynamoCourseRepository>;

static HANDLER: OnceCell<Handler> = OnceCell::const_new();

async fn get_handler() -> Result<&'static Handler, ConfigError> {
    HANDLER
        .get_or_try_init(|| async {
            let bucket = BucketConfig::from_env(BUCKET_NAME_VAR)?;
            let table_name = required_env(COURSE_TABLE_VAR)?;
            let sdk_config = load_aws_config().await;

            let store = S3ObjectStore::new(aws_sdk_s3::Client::new(&sdk_config), bucket);
            let courses =
                DynamoCourseRepository::new(aws_sdk_dynamodb::Client::new(&sdk_config), table_name);
            Ok(CourseHandler::new(store, courses))
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
