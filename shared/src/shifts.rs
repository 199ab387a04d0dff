use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::api::{json_response, parse_body, ApiError};
use crate::resolve::{decorate, resolve_owners};
use crate::store::{
    add_to_set, delete_record, get_record, n, put_record, s, scan_all,
    update_record_fields,
};
use crate::types::{
    Org, PatchShiftRequest, PostShiftRequest, Shift, ShiftStatus, User,
};
use crate::urn::Owner;

/// Epoch milliseconds from an ISO-8601 timestamp.
pub fn parse_time_ms(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// GET /shifts - every shift, owner-decorated.
pub async fn get_all_shifts(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let shifts = scan_all::<Shift>(client, table_name).await;

    let urns: Vec<String> = shifts.iter().map(|shift| shift.owner_urn.clone()).collect();
    let owners = match resolve_owners(client, table_name, &urns).await {
        Ok(owners) => owners,
        Err(bad) => return ApiError::from(bad).into_response(),
    };
    let rows = decorate(&shifts, |shift| &shift.owner_urn, &owners);

    json_response(StatusCode::OK, serde_json::Value::Array(rows))
}

/// GET /shifts/{id}
pub async fn get_shift(
    client: &DynamoClient,
    table_name: &str,
    shift_id: &str,
) -> Result<Response<Body>, Error> {
    match get_record::<Shift>(client, table_name, shift_id).await {
        Some(shift) => json_response(StatusCode::OK, serde_json::to_value(&shift)?),
        None => ApiError::not_found("Shift not found", shift_id).into_response(),
    }
}

/// POST /shifts - owner is the supplied org, or the requesting user when no
/// org is given. Status starts `open`.
pub async fn post_shift(
    client: &DynamoClient,
    table_name: &str,
    requesting_user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: PostShiftRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let mut missing = Vec::new();
    if req.name.as_deref().unwrap_or("").is_empty() {
        missing.push("name");
    }
    if req.start_date.as_deref().unwrap_or("").is_empty() {
        missing.push("startDate");
    }
    if req.end_date.as_deref().unwrap_or("").is_empty() {
        missing.push("endDate");
    }
    if !missing.is_empty() {
        return ApiError::validation("You are missing some required fields", missing)
            .into_response();
    }

    let start_date = req.start_date.unwrap_or_default();
    let end_date = req.end_date.unwrap_or_default();
    let (Some(start_time_ms), Some(end_time_ms)) =
        (parse_time_ms(&start_date), parse_time_ms(&end_date))
    else {
        return ApiError::validation(
            "Start and end dates must be ISO-8601 timestamps",
            vec!["startDate", "endDate"],
        )
        .into_response();
    };

    let owner = match req.org_id.as_deref().filter(|id| !id.is_empty()) {
        Some(org_id) => {
            tracing::info!("Fetching org {}", org_id);
            if get_record::<Org>(client, table_name, org_id).await.is_none() {
                return ApiError::not_found("Org not found", org_id).into_response();
            }
            Owner::org(org_id)
        }
        None => Owner::user(requesting_user_id),
    };

    let mut assigned_to = Vec::new();
    if let Some(assignee) = req.assigned_to.as_deref().filter(|id| !id.is_empty()) {
        if get_record::<User>(client, table_name, assignee).await.is_none() {
            return ApiError::not_found("User assigned to not found", assignee)
                .into_response();
        }
        assigned_to.push(Owner::user(assignee).urn());
    }

    let now = chrono::Utc::now().timestamp_millis();
    let shift = Shift {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.unwrap_or_default(),
        owner_urn: owner.urn(),
        status: ShiftStatus::Open,
        location: req.location.unwrap_or_default(),
        description: req.description.unwrap_or_default(),
        assigned_to,
        start_time_ms,
        end_time_ms,
        start_date_iso: start_date,
        end_date_iso: end_date,
        created_at_ms: now,
        updated_at_ms: now,
    };

    tracing::info!("Creating shift {}", shift.id);
    if !put_record(client, table_name, &shift).await {
        return ApiError::upstream("Failed to save shift").into_response();
    }

    if let Some(assignee) = req.assigned_to.as_deref().filter(|id| !id.is_empty()) {
        add_to_set::<User>(client, table_name, assignee, "shiftHistory", &shift.id)
            .await;
    }

    json_response(StatusCode::OK, serde_json::to_value(&shift)?)
}

/// PATCH /shifts/{id} - partial update. Omitted fields stay untouched;
/// present fields are applied even when empty; enum-valued fields must
/// parse.
pub async fn patch_shift(
    client: &DynamoClient,
    table_name: &str,
    shift_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    if get_record::<Shift>(client, table_name, shift_id).await.is_none() {
        return ApiError::not_found("Shift not found", shift_id).into_response();
    }

    let req: PatchShiftRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let mut fields: Vec<(&str, AttributeValue)> = Vec::new();

    if let Some(org_id) = req.org_id.as_deref() {
        if get_record::<Org>(client, table_name, org_id).await.is_none() {
            return ApiError::not_found("Org not found", org_id).into_response();
        }
        fields.push(("ownerUrn", s(&Owner::org(org_id).urn())));
    }
    if let Some(status) = req.status.as_deref() {
        let Some(status) = ShiftStatus::parse(status) else {
            return ApiError::validation("Invalid shift status", vec!["status"])
                .into_response();
        };
        fields.push(("status", s(status.as_str())));
    }
    if let Some(start_date) = req.start_date.as_deref() {
        let Some(start_time_ms) = parse_time_ms(start_date) else {
            return ApiError::validation(
                "Start date must be an ISO-8601 timestamp",
                vec!["startDate"],
            )
            .into_response();
        };
        fields.push(("startTimeMs", n(start_time_ms)));
        fields.push(("startDateIso", s(start_date)));
    }
    if let Some(end_date) = req.end_date.as_deref() {
        let Some(end_time_ms) = parse_time_ms(end_date) else {
            return ApiError::validation(
                "End date must be an ISO-8601 timestamp",
                vec!["endDate"],
            )
            .into_response();
        };
        fields.push(("endTimeMs", n(end_time_ms)));
        fields.push(("endDateIso", s(end_date)));
    }
    if let Some(name) = req.name {
        fields.push(("name", s(&name)));
    }
    if let Some(description) = req.description {
        fields.push(("description", s(&description)));
    }
    if let Some(location) = req.location {
        fields.push(("location", s(&location)));
    }

    if fields.is_empty() {
        return ApiError::validation(
            "You didn't pass in anything to update",
            vec![
                "name",
                "orgId",
                "startDate",
                "endDate",
                "description",
                "location",
                "status",
            ],
        )
        .into_response();
    }

    tracing::info!("Updating shift {}", shift_id);
    match update_record_fields::<Shift>(client, table_name, shift_id, fields).await {
        Some(shift) => json_response(StatusCode::OK, serde_json::to_value(&shift)?),
        None => ApiError::upstream("Failed to update shift").into_response(),
    }
}

/// DELETE /shifts/{id} - unconditional, no cascade. Applications pointing at
/// the deleted shift stay behind and are tolerated at read time.
pub async fn delete_shift(
    client: &DynamoClient,
    table_name: &str,
    shift_id: &str,
) -> Result<Response<Body>, Error> {
    let deleted = delete_record::<Shift>(client, table_name, shift_id).await;
    if deleted {
        json_response(StatusCode::OK, serde_json::json!({ "success": true }))
    } else {
        ApiError::upstream("Failed to delete shift").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_timestamps_become_epoch_millis() {
        assert_eq!(
            parse_time_ms("2023-11-14T22:13:20Z"),
            Some(1_700_000_000_000)
        );
        assert_eq!(
            parse_time_ms(" 2023-11-14T22:13:20+00:00 "),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn bad_timestamps_are_rejected() {
        assert_eq!(parse_time_ms("next tuesday"), None);
        assert_eq!(parse_time_ms(""), None);
        assert_eq!(parse_time_ms("2023-11-14"), None);
    }
}
