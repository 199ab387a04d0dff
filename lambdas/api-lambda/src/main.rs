use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sns::Client as SnsClient;
use labor_pool_shared::{config, AppState};
use lambda_http::{run, service_fn, tracing, Error, Request};
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Initialize AWS clients once at startup
    let aws_config = aws_config::load_from_env().await;

    let state = AppState::new(
        DynamoClient::new(&aws_config),
        SnsClient::new(&aws_config),
        config::table_name(),
    );

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
