use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::api::{json_response, parse_body, ApiError};
use crate::resolve::{decorate, resolve_owners};
use crate::store::{get_record, s, scan_contains, scan_equals, update_record_fields};
use crate::types::{PatchUserRequest, Shift, ShiftApplication, User};
use crate::urn::Owner;

/// GET /users/{id}
pub async fn get_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Response<Body>, Error> {
    match get_record::<User>(client, table_name, user_id).await {
        Some(user) => json_response(StatusCode::OK, serde_json::to_value(&user)?),
        None => ApiError::not_found("User not found", user_id).into_response(),
    }
}

/// PATCH /users/{id} - profile patch. Only fields present in the body are
/// written; an explicit empty string clears the field.
pub async fn patch_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: PatchUserRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    if get_record::<User>(client, table_name, user_id).await.is_none() {
        return ApiError::not_found("User not found", user_id).into_response();
    }

    let mut fields: Vec<(&str, AttributeValue)> = Vec::new();
    if let Some(first_name) = req.first_name {
        fields.push(("firstName", s(&first_name)));
    }
    if let Some(last_name) = req.last_name {
        fields.push(("lastName", s(&last_name)));
    }
    if let Some(phone_number) = req.phone_number {
        fields.push(("phoneNumber", s(&phone_number)));
    }
    if let Some(location) = req.location {
        fields.push(("location", s(&location)));
    }
    if let Some(description) = req.description {
        fields.push(("description", s(&description)));
    }
    if let Some(allow_sms) = req.allow_sms {
        fields.push(("allowSms", AttributeValue::Bool(allow_sms)));
    }

    if fields.is_empty() {
        return ApiError::validation(
            "You didn't pass in anything to update",
            vec![
                "firstName",
                "lastName",
                "phoneNumber",
                "location",
                "description",
                "allowSms",
            ],
        )
        .into_response();
    }

    tracing::info!("Updating user {}", user_id);
    match update_record_fields::<User>(client, table_name, user_id, fields).await {
        Some(user) => json_response(StatusCode::OK, serde_json::to_value(&user)?),
        None => ApiError::upstream("Failed to update user").into_response(),
    }
}

/// GET /users/{id}/shifts - shifts the user owns or is assigned to,
/// deduplicated, each decorated with its resolved owner.
pub async fn get_user_shifts(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Response<Body>, Error> {
    let urn = Owner::user(user_id).urn();

    let (assigned, created) = tokio::join!(
        scan_contains::<Shift>(client, table_name, "assignedTo", &urn),
        scan_equals::<Shift>(client, table_name, "ownerUrn", &urn),
    );

    let mut shifts = assigned;
    for shift in created {
        if !shifts.iter().any(|existing| existing.id == shift.id) {
            shifts.push(shift);
        }
    }

    let urns: Vec<String> = shifts.iter().map(|shift| shift.owner_urn.clone()).collect();
    let owners = match resolve_owners(client, table_name, &urns).await {
        Ok(owners) => owners,
        Err(bad) => return ApiError::from(bad).into_response(),
    };
    let rows = decorate(&shifts, |shift| &shift.owner_urn, &owners);

    json_response(StatusCode::OK, serde_json::Value::Array(rows))
}

/// GET /users/{id}/applications
pub async fn get_user_applications(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Response<Body>, Error> {
    let urn = Owner::user(user_id).urn();
    let applications =
        scan_equals::<ShiftApplication>(client, table_name, "ownerUrn", &urn).await;

    let urns: Vec<String> = applications
        .iter()
        .map(|application| application.owner_urn.clone())
        .collect();
    let owners = match resolve_owners(client, table_name, &urns).await {
        Ok(owners) => owners,
        Err(bad) => return ApiError::from(bad).into_response(),
    };
    let rows = decorate(&applications, |application| &application.owner_urn, &owners);

    json_response(StatusCode::OK, serde_json::Value::Array(rows))
}
