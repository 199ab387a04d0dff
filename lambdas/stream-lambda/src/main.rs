use aws_config;
use aws_lambda_events::event::dynamodb::{Event, EventRecord};
use aws_sdk_dynamodb::Client as DynamoClient;
use labor_pool_shared::{config, events};
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

async fn function_handler(event: LambdaEvent<Event>) -> Result<(), Error> {
    tracing::info!(
        "DynamoDB Stream event received with {} records",
        event.payload.records.len()
    );

    let aws_config = aws_config::load_from_env().await;
    let dynamo_client = DynamoClient::new(&aws_config);
    let table_name = config::table_name();

    // One bad record never blocks the rest of the batch
    for record in event.payload.records {
        if let Err(e) = process_record(&record, &dynamo_client, &table_name).await {
            tracing::error!("Failed to process record: {}", e);
        }
    }

    Ok(())
}

async fn process_record(
    record: &EventRecord,
    dynamo_client: &DynamoClient,
    table_name: &str,
) -> Result<(), Error> {
    let event_name = &record.event_name;

    // REMOVE events carry no new image; fall back to the old one so the
    // audit row keeps the final snapshot of the deleted record.
    let image = if record.change.new_image.is_empty() {
        &record.change.old_image
    } else {
        &record.change.new_image
    };
    if image.is_empty() {
        return Ok(());
    }

    let snapshot = untag_value(&serde_json::to_value(image)?);
    let pk = snapshot
        .get("PK")
        .and_then(|v| v.as_str())
        .ok_or("Missing PK")?
        .to_string();

    // Audit rows are themselves streamed; writing events about events
    // would loop forever. Unknown prefixes are skipped too.
    let Some(record_type) = record_type_from_pk(&pk) else {
        return Ok(());
    };

    tracing::info!("Processing {} event for {}", event_name, pk);

    let change_event = events::build_change_event(event_name, record_type, snapshot);
    if !events::append_event(dynamo_client, table_name, &change_event).await {
        return Err(format!("Failed to save change event for {}", pk).into());
    }

    Ok(())
}

fn record_type_from_pk(pk: &str) -> Option<&'static str> {
    if pk.starts_with("SHIFT#") {
        Some("shift")
    } else if pk.starts_with("APPLICATION#") {
        Some("shiftApplication")
    } else if pk.starts_with("USER#") {
        Some("user")
    } else if pk.starts_with("ORG#") {
        Some("org")
    } else {
        None
    }
}

/// Collapse DynamoDB's tagged attribute JSON ({"S": "x"}, {"N": "1"}, ...)
/// into plain JSON values.
fn untag_value(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    let Some(map) = value.as_object() else {
        return value.clone();
    };

    if map.len() == 1 {
        let (tag, inner) = map.iter().next().unwrap();
        match (tag.as_str(), inner) {
            ("S", Value::String(s)) => return Value::String(s.clone()),
            ("N", Value::String(n)) => {
                if let Ok(parsed) = n.parse::<i64>() {
                    return Value::from(parsed);
                }
                if let Ok(parsed) = n.parse::<f64>() {
                    return Value::from(parsed);
                }
                return Value::String(n.clone());
            }
            ("BOOL", Value::Bool(b)) => return Value::Bool(*b),
            ("NULL", Value::Bool(true)) => return Value::Null,
            ("SS" | "NS", Value::Array(items)) => return Value::Array(items.clone()),
            ("L", Value::Array(items)) => {
                return Value::Array(items.iter().map(untag_value).collect());
            }
            ("M", Value::Object(inner_map)) => {
                return Value::Object(
                    inner_map
                        .iter()
                        .map(|(k, v)| (k.clone(), untag_value(v)))
                        .collect(),
                );
            }
            _ => {}
        }
    }

    // Top-level image: a plain map of attribute name to tagged value
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), untag_value(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_types_follow_key_prefixes() {
        assert_eq!(record_type_from_pk("SHIFT#s1"), Some("shift"));
        assert_eq!(
            record_type_from_pk("APPLICATION#a1"),
            Some("shiftApplication")
        );
        assert_eq!(record_type_from_pk("USER#u1"), Some("user"));
        assert_eq!(record_type_from_pk("ORG#acme"), Some("org"));
    }

    #[test]
    fn audit_rows_and_unknown_prefixes_are_skipped() {
        assert_eq!(record_type_from_pk("EVENT#e1"), None);
        assert_eq!(record_type_from_pk("CONNECTION#c1"), None);
        assert_eq!(record_type_from_pk("s1"), None);
    }

    #[test]
    fn tagged_attributes_collapse_to_plain_json() {
        let tagged = json!({
            "PK": {"S": "SHIFT#s1"},
            "id": {"S": "s1"},
            "startTimeMs": {"N": "1700000000000"},
            "assignedTo": {"SS": ["urn:user:u1"]},
            "orgRoles": {"M": {"acme": {"S": "manager"}}},
            "allowSms": {"BOOL": true},
        });
        let plain = untag_value(&tagged);
        assert_eq!(plain["PK"], "SHIFT#s1");
        assert_eq!(plain["startTimeMs"], 1_700_000_000_000i64);
        assert_eq!(plain["assignedTo"], json!(["urn:user:u1"]));
        assert_eq!(plain["orgRoles"]["acme"], "manager");
        assert_eq!(plain["allowSms"], true);
    }
}
