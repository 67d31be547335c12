/// 受講登録Lambda
///
/// 環境変数: ENROLLMENT_TABLE_NAME
use lambda_http::{Body, Error, Request, Response, run, service_fn};
use lms_api::application::{EnrollmentHandler, configuration_error, dispatch};
use lms_api::infrastructure::config::ENROLLMENT_TABLE_VAR;
use lms_api::infrastructure::{
    ConfigError, DynamoEnrollmentRepository, init_logging, load_aws_config, required_env,
};
use tokio::sync::OnceCell;

static HANDLER: OnceCell<EnrollmentHandler<DynamoEnrollmentRepository>> = OnceCell::const_new();

async fn get_handler()
-> Result<&'static EnrollmentHandler<DynamoEnrollmentRepository>, ConfigError> {
    HANDLER
        .get_or_try_init(|| async {
            let table_name = required_env(ENROLLMENT_TABLE_VAR)?;
            let sdk_config = load_aws_config().await;
            let client = aws_sdk_dynamodb::Client::new(&sdk_config);
            Ok(EnrollmentHandler::new(DynamoEnrollmentRepository::new(
                client, table_name,
            )))
        })
        .await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
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
