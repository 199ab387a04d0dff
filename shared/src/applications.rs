use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sns::Client as SnsClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::api::{json_response, parse_body, ApiError};
use crate::lifecycle::{plan_status_change, ShiftAssignment, StatusChange};
use crate::notify::{notify_applicant_of_outcome, notify_owner_of_application};
use crate::resolve::{decorate, resolve_owners};
use crate::store::{
    add_to_set, delete_record, get_record, put_record, s, scan_equals,
    update_record_fields,
};
use crate::types::{
    ApplicationStatus, PatchApplicationRequest, PostApplicationRequest, Shift,
    ShiftApplication, User,
};
use crate::urn::Owner;

/// GET /shifts/{id}/applications
pub async fn get_shift_applications(
    client: &DynamoClient,
    table_name: &str,
    shift_id: &str,
) -> Result<Response<Body>, Error> {
    let applications =
        scan_equals::<ShiftApplication>(client, table_name, "shiftId", shift_id).await;

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

/// POST /shifts/{id}/applications - creates a pending application and pings
/// the shift owner.
pub async fn post_application(
    dynamo: &DynamoClient,
    sns: &SnsClient,
    table_name: &str,
    shift_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: PostApplicationRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let Some(owner_urn) = req.owner_urn.filter(|urn| !urn.is_empty()) else {
        return ApiError::validation(
            "Applicant owner urn is required",
            vec!["ownerUrn"],
        )
        .into_response();
    };
    if Owner::parse(&owner_urn).is_err() {
        return ApiError::validation(
            "Applicant owner urn must be urn:user:<id> or urn:org:<id>",
            vec!["ownerUrn"],
        )
        .into_response();
    }

    if get_record::<Shift>(dynamo, table_name, shift_id).await.is_none() {
        return ApiError::not_found("Shift being applied to not found", shift_id)
            .into_response();
    }

    let now = chrono::Utc::now().timestamp_millis();
    let application = ShiftApplication {
        id: uuid::Uuid::new_v4().to_string(),
        shift_id: shift_id.to_string(),
        owner_urn,
        description: req.description.unwrap_or_default(),
        status: ApplicationStatus::Pending,
        created_at_ms: now,
        updated_at_ms: now,
    };

    tracing::info!("Creating application {} for shift {}", application.id, shift_id);
    if !put_record(dynamo, table_name, &application).await {
        return ApiError::upstream("Failed to save shift application").into_response();
    }

    notify_owner_of_application(dynamo, sns, table_name, &application).await;

    json_response(StatusCode::OK, serde_json::to_value(&application)?)
}

/// The writes the accept/reject transition performs, seamed so the
/// non-atomic execution order is testable without a live table.
trait DecisionStore {
    async fn set_application_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
    ) -> Option<ShiftApplication>;
    async fn fill_shift(&self, assignment: &ShiftAssignment) -> bool;
    async fn record_assignee_history(&self, user_id: &str, shift_id: &str);
}

struct DynamoDecisions<'a> {
    client: &'a DynamoClient,
    table_name: &'a str,
}

impl DecisionStore for DynamoDecisions<'_> {
    async fn set_application_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
    ) -> Option<ShiftApplication> {
        update_record_fields::<ShiftApplication>(
            self.client,
            self.table_name,
            application_id,
            vec![("status", s(status.as_str()))],
        )
        .await
    }

    async fn fill_shift(&self, assignment: &ShiftAssignment) -> bool {
        let status_set = update_record_fields::<Shift>(
            self.client,
            self.table_name,
            &assignment.shift_id,
            vec![("status", s(assignment.new_status.as_str()))],
        )
        .await
        .is_some();
        let assignee_added = add_to_set::<Shift>(
            self.client,
            self.table_name,
            &assignment.shift_id,
            "assignedTo",
            &assignment.assignee_urn,
        )
        .await;
        status_set && assignee_added
    }

    async fn record_assignee_history(&self, user_id: &str, shift_id: &str) {
        add_to_set::<User>(self.client, self.table_name, user_id, "shiftHistory", shift_id)
            .await;
    }
}

/// Apply a validated plan. The application and shift writes are separate
/// single-item updates, not a transaction: a shift-side failure after the
/// application update surfaces as Upstream with the application already
/// decided, recoverable via the shift patch path and visible in the audit
/// trail.
async fn execute_status_change<S: DecisionStore>(
    store: &S,
    application_id: &str,
    plan: StatusChange,
) -> Result<ShiftApplication, ApiError> {
    tracing::info!(
        "Updating application {} to {}",
        application_id,
        plan.new_status.as_str()
    );
    let Some(updated) = store
        .set_application_status(application_id, plan.new_status)
        .await
    else {
        return Err(ApiError::upstream("Failed to update application status"));
    };

    if let Some(assignment) = plan.shift_update {
        tracing::info!(
            "Filling shift {} with {}",
            assignment.shift_id,
            assignment.assignee_urn
        );
        if !store.fill_shift(&assignment).await {
            return Err(ApiError::upstream("Failed to update shift to filled"));
        }

        if let Ok(Owner::User(user_id)) = Owner::parse(&assignment.assignee_urn) {
            store
                .record_assignee_history(&user_id, &assignment.shift_id)
                .await;
        }
    }

    Ok(updated)
}

/// PATCH /applications/{id} - the accept/reject transition. Accepting also
/// fills the shift and records the assignee.
pub async fn patch_application_status(
    dynamo: &DynamoClient,
    sns: &SnsClient,
    table_name: &str,
    application_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: PatchApplicationRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let requested = req
        .status
        .as_deref()
        .and_then(ApplicationStatus::parse);
    let Some(requested) = requested else {
        return ApiError::validation(
            "Invalid shift application status, expected accepted or rejected",
            vec!["status"],
        )
        .into_response();
    };

    let Some(application) =
        get_record::<ShiftApplication>(dynamo, table_name, application_id).await
    else {
        return ApiError::not_found("Shift application not found", application_id)
            .into_response();
    };

    let Some(shift) =
        get_record::<Shift>(dynamo, table_name, &application.shift_id).await
    else {
        return ApiError::not_found(
            "Shift being applied to not found",
            &application.shift_id,
        )
        .into_response();
    };

    let plan = match plan_status_change(&application, &shift, requested) {
        Ok(plan) => plan,
        Err(e) => return e.into_response(),
    };

    let store = DynamoDecisions {
        client: dynamo,
        table_name,
    };
    let updated = match execute_status_change(&store, application_id, plan).await {
        Ok(updated) => updated,
        Err(e) => return e.into_response(),
    };

    notify_applicant_of_outcome(dynamo, sns, table_name, &updated, requested).await;

    json_response(StatusCode::OK, serde_json::to_value(&updated)?)
}

/// DELETE /applications/{id}
pub async fn delete_application(
    client: &DynamoClient,
    table_name: &str,
    application_id: &str,
) -> Result<Response<Body>, Error> {
    let deleted =
        delete_record::<ShiftApplication>(client, table_name, application_id).await;
    if deleted {
        json_response(StatusCode::OK, serde_json::json!({ "success": true }))
    } else {
        ApiError::upstream("Failed to delete shift application").into_response()
    }
}
