use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::api::{json_response, ApiError};
use crate::resolve::{decorate, resolve_owners};
use crate::store::{put_record, scan_all, scan_equals};
use crate::types::EventRow;

/// GET /events - the whole audit trail, owner-decorated.
pub async fn get_all_events(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let events = scan_all::<EventRow>(client, table_name).await;
    decorated_response(client, table_name, events).await
}

/// GET /entities/{urn}/events - audit rows owned by one entity.
pub async fn get_entity_events(
    client: &DynamoClient,
    table_name: &str,
    entity_urn: &str,
) -> Result<Response<Body>, Error> {
    if entity_urn.is_empty() {
        return ApiError::validation("No urn provided in path", vec!["urn"])
            .into_response();
    }

    let events =
        scan_equals::<EventRow>(client, table_name, "ownerUrn", entity_urn).await;
    decorated_response(client, table_name, events).await
}

async fn decorated_response(
    client: &DynamoClient,
    table_name: &str,
    events: Vec<EventRow>,
) -> Result<Response<Body>, Error> {
    let urns: Vec<String> = events.iter().map(|event| event.owner_urn.clone()).collect();
    let owners = match resolve_owners(client, table_name, &urns).await {
        Ok(owners) => owners,
        Err(bad) => return ApiError::from(bad).into_response(),
    };
    let rows = decorate(&events, |event| &event.owner_urn, &owners);
    json_response(StatusCode::OK, serde_json::Value::Array(rows))
}

/// Build the audit row for one change notification. The owner is the
/// record's own `ownerUrn` when it has one, otherwise the changed entity
/// itself (users and orgs own their own history).
pub fn build_change_event(
    event_name: &str,
    record_type: &str,
    snapshot: serde_json::Value,
) -> EventRow {
    let record_id = snapshot
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let event_urn = format!("urn:{}:{}", record_type, record_id);
    let owner_urn = snapshot
        .get("ownerUrn")
        .and_then(|v| v.as_str())
        .filter(|urn| !urn.is_empty())
        .map(|urn| urn.to_string())
        .unwrap_or_else(|| event_urn.clone());

    EventRow {
        id: uuid::Uuid::new_v4().to_string(),
        event_urn,
        owner_urn,
        event: event_name.to_string(),
        description: format!("Record {} for {}", event_name, record_type),
        record: snapshot,
        created_at_ms: chrono::Utc::now().timestamp_millis(),
    }
}

/// Append one audit row. Append-only: nothing ever updates or deletes these.
pub async fn append_event(
    client: &DynamoClient,
    table_name: &str,
    event: &EventRow,
) -> bool {
    put_record(client, table_name, event).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_event_uses_record_owner_urn() {
        let event = build_change_event(
            "INSERT",
            "shift",
            serde_json::json!({"id": "s1", "ownerUrn": "urn:org:acme"}),
        );
        assert_eq!(event.event_urn, "urn:shift:s1");
        assert_eq!(event.owner_urn, "urn:org:acme");
        assert_eq!(event.event, "INSERT");
        assert_eq!(event.description, "Record INSERT for shift");
        assert_eq!(event.record["id"], "s1");
    }

    #[test]
    fn change_event_falls_back_to_the_entity_itself() {
        let event = build_change_event(
            "MODIFY",
            "user",
            serde_json::json!({"id": "u1", "firstName": "Ada"}),
        );
        assert_eq!(event.event_urn, "urn:user:u1");
        assert_eq!(event.owner_urn, "urn:user:u1");
    }
}
