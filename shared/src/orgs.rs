use std::collections::HashMap;

use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::api::{json_response, parse_body, ApiError};
use crate::resolve::{decorate, resolve_owners};
use crate::store::{
    add_to_set, get_record, put_record, s, scan_equals, update_record_fields,
};
use crate::types::{
    Org, OrgRole, PostFriendRequest, PostMemberRequest, PostOrgRequest, Shift,
    ShiftApplication, User,
};
use crate::urn::Owner;

/// Org ids are slugs of the name: lowercase, whitespace collapsed to '-'.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// GET /orgs/{id}
pub async fn get_org(
    client: &DynamoClient,
    table_name: &str,
    org_id: &str,
) -> Result<Response<Body>, Error> {
    match get_record::<Org>(client, table_name, org_id).await {
        Some(org) => json_response(StatusCode::OK, serde_json::to_value(&org)?),
        None => ApiError::not_found("Org not found", org_id).into_response(),
    }
}

/// POST /orgs - the requesting user becomes owner and first member.
pub async fn post_org(
    client: &DynamoClient,
    table_name: &str,
    requesting_user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: PostOrgRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let Some(name) = req.name.filter(|name| !name.trim().is_empty()) else {
        return ApiError::validation("Org name is required", vec!["name"])
            .into_response();
    };

    let org_id = slugify(&name);
    if get_record::<Org>(client, table_name, &org_id).await.is_some() {
        return ApiError::conflict("An org with this name already exists", &org_id)
            .into_response();
    }

    let owner = Owner::user(requesting_user_id);
    let now = chrono::Utc::now().timestamp_millis();
    let org = Org {
        id: org_id.clone(),
        name,
        owner_urn: owner.urn(),
        primary_members: vec![requesting_user_id.to_string()],
        friends: vec![],
        schedules: vec![],
        join_code: uuid::Uuid::new_v4().to_string(),
        phone_number: req.phone_number.unwrap_or_default(),
        location: req.location.unwrap_or_default(),
        description: req.description.unwrap_or_default(),
        created_at_ms: now,
        updated_at_ms: now,
    };

    tracing::info!("Creating org {}", org_id);
    if !put_record(client, table_name, &org).await {
        return ApiError::upstream("Failed to save org").into_response();
    }

    // Mirror the membership onto the creator when we know who they are.
    if let Some(user) = get_record::<User>(client, table_name, requesting_user_id).await
    {
        add_membership(
            client,
            table_name,
            &user,
            &org_id,
            OrgRole::Manager,
        )
        .await;
    }

    json_response(StatusCode::OK, serde_json::to_value(&org)?)
}

/// POST /orgs/{id}/members - add a user to the org and the org to the user.
/// Both sides are idempotent.
pub async fn post_org_member(
    client: &DynamoClient,
    table_name: &str,
    org_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: PostMemberRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let Some(member_id) = req.member_id.filter(|id| !id.is_empty()) else {
        return ApiError::validation("Member id is required", vec!["memberId"])
            .into_response();
    };

    let role = match req.role.as_deref() {
        None | Some("") => OrgRole::Employee,
        Some(raw) => match OrgRole::parse(raw) {
            Some(role) => role,
            None => {
                return ApiError::validation("Unknown org role", vec!["role"])
                    .into_response()
            }
        },
    };

    let org = get_record::<Org>(client, table_name, org_id).await;
    let member = get_record::<User>(client, table_name, &member_id).await;
    let (Some(org), Some(member)) = (org, member) else {
        return ApiError::not_found(
            "The org or member was not found",
            &format!("{}/{}", org_id, member_id),
        )
        .into_response();
    };

    if org.primary_members.contains(&member_id) {
        tracing::info!("Org {} already contains member {}", org_id, member_id);
    } else if !add_to_set::<Org>(client, table_name, org_id, "primaryMembers", &member_id)
        .await
    {
        return ApiError::upstream("Failed to save org").into_response();
    }

    if member.orgs.contains(&org.id) {
        tracing::info!("User {} already belongs to org {}", member_id, org_id);
    } else if !add_membership(client, table_name, &member, org_id, role).await {
        return ApiError::upstream("Failed to save member").into_response();
    }

    json_response(StatusCode::OK, serde_json::json!({ "success": true }))
}

/// POST /orgs/{id}/friends - symmetric: both orgs end up in each other's
/// friends set, each side idempotent.
pub async fn post_org_friend(
    client: &DynamoClient,
    table_name: &str,
    org_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: PostFriendRequest = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    let Some(friendly_org_id) = req
        .friendly_org_id
        .map(|id| id.to_lowercase())
        .filter(|id| !id.is_empty())
    else {
        return ApiError::validation(
            "Friendly org id is required",
            vec!["friendlyOrgId"],
        )
        .into_response();
    };

    let main_org = get_record::<Org>(client, table_name, org_id).await;
    let friendly_org = get_record::<Org>(client, table_name, &friendly_org_id).await;
    let (Some(main_org), Some(friendly_org)) = (main_org, friendly_org) else {
        return ApiError::not_found(
            "An org was not found",
            &format!("{}/{}", org_id, friendly_org_id),
        )
        .into_response();
    };

    if main_org.id == friendly_org.id {
        return json_response(
            StatusCode::OK,
            serde_json::json!({ "message": "You are befriending yourself!" }),
        );
    }

    if main_org.friends.contains(&friendly_org_id) {
        tracing::info!("{} is already friends with {}", org_id, friendly_org_id);
    } else if !add_to_set::<Org>(client, table_name, org_id, "friends", &friendly_org_id)
        .await
    {
        return ApiError::upstream("Failed to save org").into_response();
    }

    if friendly_org.friends.contains(&main_org.id) {
        tracing::info!("{} is already friends with {}", friendly_org_id, org_id);
    } else if !add_to_set::<Org>(client, table_name, &friendly_org_id, "friends", org_id)
        .await
    {
        return ApiError::upstream("Failed to save org friend").into_response();
    }

    json_response(StatusCode::OK, serde_json::json!({ "success": true }))
}

/// GET /orgs/{id}/shifts
pub async fn get_org_shifts(
    client: &DynamoClient,
    table_name: &str,
    org_id: &str,
) -> Result<Response<Body>, Error> {
    let urn = Owner::org(org_id).urn();
    let shifts = scan_equals::<Shift>(client, table_name, "ownerUrn", &urn).await;

    let urns: Vec<String> = shifts.iter().map(|shift| shift.owner_urn.clone()).collect();
    let owners = match resolve_owners(client, table_name, &urns).await {
        Ok(owners) => owners,
        Err(bad) => return ApiError::from(bad).into_response(),
    };
    let rows = decorate(&shifts, |shift| &shift.owner_urn, &owners);

    json_response(StatusCode::OK, serde_json::Value::Array(rows))
}

/// GET /orgs/{id}/applications
pub async fn get_org_applications(
    client: &DynamoClient,
    table_name: &str,
    org_id: &str,
) -> Result<Response<Body>, Error> {
    let urn = Owner::org(org_id).urn();
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

/// Record a membership on the user side: org id joins `orgs`, role lands in
/// the `orgRoles` map. The map is rewritten whole since DynamoDB cannot ADD
/// into a possibly-absent map attribute.
async fn add_membership(
    client: &DynamoClient,
    table_name: &str,
    user: &User,
    org_id: &str,
    role: OrgRole,
) -> bool {
    if !add_to_set::<User>(client, table_name, &user.id, "orgs", org_id).await {
        return false;
    }

    let mut roles = user.org_roles.clone();
    roles.insert(org_id.to_string(), role.as_str().to_string());
    let role_map: HashMap<String, AttributeValue> = roles
        .iter()
        .map(|(k, v)| (k.clone(), s(v)))
        .collect();

    update_record_fields::<User>(
        client,
        table_name,
        &user.id,
        vec![("orgRoles", AttributeValue::M(role_map))],
    )
    .await
    .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_joins_words() {
        assert_eq!(slugify("Acme"), "acme");
        assert_eq!(slugify("Acme Freight Co"), "acme-freight-co");
        assert_eq!(slugify("  Dock   Crew  "), "dock-crew");
    }

    #[test]
    fn org_roles_parse_closed_set() {
        assert_eq!(OrgRole::parse("manager"), Some(OrgRole::Manager));
        assert_eq!(OrgRole::parse("employee"), Some(OrgRole::Employee));
        assert_eq!(OrgRole::parse("admin"), None);
    }
}
