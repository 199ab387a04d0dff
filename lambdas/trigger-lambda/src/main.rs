use aws_lambda_events::event::cognito::CognitoEventUserPoolsPostConfirmation;
use aws_sdk_dynamodb::Client as DynamoClient;
use labor_pool_shared::{config, identity};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    run(service_fn(function_handler)).await
}

/// Post-confirmation trigger: provision the user record, then hand the
/// event straight back. A provisioning failure must never block the
/// confirmation itself, so errors are logged and swallowed.
async fn function_handler(
    event: LambdaEvent<CognitoEventUserPoolsPostConfirmation>,
) -> Result<CognitoEventUserPoolsPostConfirmation, Error> {
    let payload = event.payload;
    let attributes = &payload.request.user_attributes;

    let subject_id = attributes
        .get("sub")
        .cloned()
        .filter(|sub| !sub.is_empty())
        .or_else(|| payload.cognito_event_user_pools_header.user_name.clone())
        .unwrap_or_default();

    if subject_id.is_empty() {
        tracing::warn!("Confirmation event carried no subject id, skipping");
        return Ok(payload);
    }

    tracing::info!("Post-confirmation for subject {}", subject_id);

    let aws_config = aws_config::load_from_env().await;
    let dynamo_client = DynamoClient::new(&aws_config);
    let table_name = config::table_name();

    if !identity::provision_user(&dynamo_client, &table_name, &subject_id, attributes).await {
        tracing::error!("Failed to provision user {}", subject_id);
    }

    Ok(payload)
}
