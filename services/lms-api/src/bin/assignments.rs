/// 課題Lambda
///
/// 課題の一括割り当て・採点（管理者/講師）と、学生の課題一覧・提出を処理する。
/// 割り当て対象の学生は受講登録テーブルから取得する。
///
/// 環境変数:
/// - ASSIGNMENT_TABLE_NAME: 課題テーブル
/// - ENROLLMENT_TABLE_NAME: 受講登録テーブル
use lambda_http::{Body, Error, Request, Response, run, service_fn};
use lms_api::application::{AssignmentHandler, configuration_error, dispatch};
use lms_api::infrastructure::config::{ASSIGNMENT_TABLE_VAR, ENROLLMENT_TABLE_VAR};
use lms_api::infrastructure::{
    ConfigError, DynamoAssignmentRepository, DynamoEnrollmentRepository, init_logging,
    load_aws_config, required_env,
};
use tokio::sync::OnceCell;

type Handler = AssignmentHandler<DynamoAssignmentRepository, DynamoEnrollmentRepository>;

static HANDLER: OnceCell<Handler> = OnceCell::const_new();

async fn get_handler() -> Result<&'static Handler, ConfigError> {
    HANDLER
        .get_or_try_init(|| async {
            let assignment_table = required_env(ASSIGNMENT_TABLE_VAR)?;
            let enrollment_table = required_env(ENROLLMENT_TABLE_VAR)?;
            let sdk_config = load_aws_config().await;
            let client = aws_sdk_dynamodb::Client::new(&sdk_config);

            Ok(AssignmentHandler::new(
                DynamoAssignmentRepository::new(client.clone(), assignment_table),
                DynamoEnrollmentRepository::new(client, enrollment_table),
            ))
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
