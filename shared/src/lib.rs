pub mod api;
pub mod applications;
pub mod config;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod notify;
pub mod orgs;
pub mod resolve;
pub mod shifts;
pub mod sms;
pub mod store;
pub mod types;
pub mod urn;
pub mod users;

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sns::Client as SnsClient;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub sns_client: SnsClient,
    pub table_name: String,
}

impl AppState {
    pub fn new(
        dynamo_client: DynamoClient,
        sns_client: SnsClient,
        table_name: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            dynamo_client,
            sns_client,
            table_name,
        })
    }
}
