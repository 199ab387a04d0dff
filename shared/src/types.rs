use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};

use crate::store::{
    get_bool, get_map_s, get_n, get_s, get_ss, n, s, set_attr, DynamoRecord,
};

// ========== STATUS ENUMS ==========

/// Shift state machine: open -> broadcasting -> applied -> filled, with
/// expired reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Open,
    Broadcasting,
    Applied,
    Filled,
    Expired,
}

impl ShiftStatus {
    pub fn parse(value: &str) -> Option<ShiftStatus> {
        match value {
            "open" => Some(ShiftStatus::Open),
            "broadcasting" => Some(ShiftStatus::Broadcasting),
            "applied" => Some(ShiftStatus::Applied),
            "filled" => Some(ShiftStatus::Filled),
            "expired" => Some(ShiftStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open => "open",
            ShiftStatus::Broadcasting => "broadcasting",
            ShiftStatus::Applied => "applied",
            ShiftStatus::Filled => "filled",
            ShiftStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn parse(value: &str) -> Option<ApplicationStatus> {
        match value {
            "pending" => Some(ApplicationStatus::Pending),
            "accepted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Accepted and rejected are terminal; only pending applications move.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Role a user holds within an org.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgRole {
    Manager,
    Employee,
}

impl OrgRole {
    pub fn parse(value: &str) -> Option<OrgRole> {
        match value {
            "manager" => Some(OrgRole::Manager),
            "employee" => Some(OrgRole::Employee),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Manager => "manager",
            OrgRole::Employee => "employee",
        }
    }
}

// ========== USER ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub allow_sms: bool,
    pub orgs: Vec<String>,
    /// org id -> role ("manager" | "employee")
    pub org_roles: HashMap<String, String>,
    pub shift_history: Vec<String>,
    pub description: String,
    pub location: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl DynamoRecord for User {
    const PREFIX: &'static str = "USER";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<User> {
        let id = get_s(item, "id")?;
        Some(User {
            id,
            first_name: get_s(item, "firstName").unwrap_or_default(),
            last_name: get_s(item, "lastName").unwrap_or_default(),
            email: get_s(item, "email").unwrap_or_default(),
            phone_number: get_s(item, "phoneNumber").unwrap_or_default(),
            allow_sms: get_bool(item, "allowSms"),
            orgs: get_ss(item, "orgs"),
            org_roles: get_map_s(item, "orgRoles"),
            shift_history: get_ss(item, "shiftHistory"),
            description: get_s(item, "description").unwrap_or_default(),
            location: get_s(item, "location").unwrap_or_default(),
            created_at_ms: get_n(item, "createdAtMs"),
            updated_at_ms: get_n(item, "updatedAtMs"),
        })
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), s(&self.id));
        item.insert("firstName".to_string(), s(&self.first_name));
        item.insert("lastName".to_string(), s(&self.last_name));
        item.insert("email".to_string(), s(&self.email));
        item.insert("phoneNumber".to_string(), s(&self.phone_number));
        item.insert("allowSms".to_string(), AttributeValue::Bool(self.allow_sms));
        set_attr(&mut item, "orgs", &self.orgs);
        set_attr(&mut item, "shiftHistory", &self.shift_history);
        if !self.org_roles.is_empty() {
            let roles = self
                .org_roles
                .iter()
                .map(|(k, v)| (k.clone(), s(v)))
                .collect();
            item.insert("orgRoles".to_string(), AttributeValue::M(roles));
        }
        item.insert("description".to_string(), s(&self.description));
        item.insert("location".to_string(), s(&self.location));
        item.insert("createdAtMs".to_string(), n(self.created_at_ms));
        item.insert("updatedAtMs".to_string(), n(self.updated_at_ms));
        item
    }
}

// ========== ORG ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Org {
    pub id: String,
    pub name: String,
    pub owner_urn: String,
    pub primary_members: Vec<String>,
    /// Symmetric relation: A friends B implies B friends A.
    pub friends: Vec<String>,
    pub schedules: Vec<String>,
    pub join_code: String,
    pub phone_number: String,
    pub location: String,
    pub description: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl DynamoRecord for Org {
    const PREFIX: &'static str = "ORG";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<Org> {
        let id = get_s(item, "id")?;
        Some(Org {
            id,
            name: get_s(item, "name").unwrap_or_default(),
            owner_urn: get_s(item, "ownerUrn").unwrap_or_default(),
            primary_members: get_ss(item, "primaryMembers"),
            friends: get_ss(item, "friends"),
            schedules: get_ss(item, "schedules"),
            join_code: get_s(item, "joinCode").unwrap_or_default(),
            phone_number: get_s(item, "phoneNumber").unwrap_or_default(),
            location: get_s(item, "location").unwrap_or_default(),
            description: get_s(item, "description").unwrap_or_default(),
            created_at_ms: get_n(item, "createdAtMs"),
            updated_at_ms: get_n(item, "updatedAtMs"),
        })
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), s(&self.id));
        item.insert("name".to_string(), s(&self.name));
        item.insert("ownerUrn".to_string(), s(&self.owner_urn));
        set_attr(&mut item, "primaryMembers", &self.primary_members);
        set_attr(&mut item, "friends", &self.friends);
        set_attr(&mut item, "schedules", &self.schedules);
        item.insert("joinCode".to_string(), s(&self.join_code));
        item.insert("phoneNumber".to_string(), s(&self.phone_number));
        item.insert("location".to_string(), s(&self.location));
        item.insert("description".to_string(), s(&self.description));
        item.insert("createdAtMs".to_string(), n(self.created_at_ms));
        item.insert("updatedAtMs".to_string(), n(self.updated_at_ms));
        item
    }
}

// ========== SHIFT ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    pub name: String,
    pub owner_urn: String,
    pub status: ShiftStatus,
    pub location: String,
    pub description: String,
    /// Owner URNs of whoever has been assigned to work the shift.
    pub assigned_to: Vec<String>,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub start_date_iso: String,
    pub end_date_iso: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl DynamoRecord for Shift {
    const PREFIX: &'static str = "SHIFT";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<Shift> {
        let id = get_s(item, "id")?;
        let status = get_s(item, "status")
            .as_deref()
            .and_then(ShiftStatus::parse)
            .unwrap_or(ShiftStatus::Open);
        Some(Shift {
            id,
            name: get_s(item, "name").unwrap_or_default(),
            owner_urn: get_s(item, "ownerUrn").unwrap_or_default(),
            status,
            location: get_s(item, "location").unwrap_or_default(),
            description: get_s(item, "description").unwrap_or_default(),
            assigned_to: get_ss(item, "assignedTo"),
            start_time_ms: get_n(item, "startTimeMs"),
            end_time_ms: get_n(item, "endTimeMs"),
            start_date_iso: get_s(item, "startDateIso").unwrap_or_default(),
            end_date_iso: get_s(item, "endDateIso").unwrap_or_default(),
            created_at_ms: get_n(item, "createdAtMs"),
            updated_at_ms: get_n(item, "updatedAtMs"),
        })
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), s(&self.id));
        item.insert("name".to_string(), s(&self.name));
        item.insert("ownerUrn".to_string(), s(&self.owner_urn));
        item.insert("status".to_string(), s(self.status.as_str()));
        item.insert("location".to_string(), s(&self.location));
        item.insert("description".to_string(), s(&self.description));
        set_attr(&mut item, "assignedTo", &self.assigned_to);
        item.insert("startTimeMs".to_string(), n(self.start_time_ms));
        item.insert("endTimeMs".to_string(), n(self.end_time_ms));
        item.insert("startDateIso".to_string(), s(&self.start_date_iso));
        item.insert("endDateIso".to_string(), s(&self.end_date_iso));
        item.insert("createdAtMs".to_string(), n(self.created_at_ms));
        item.insert("updatedAtMs".to_string(), n(self.updated_at_ms));
        item
    }
}

// ========== SHIFT APPLICATION ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftApplication {
    pub id: String,
    pub shift_id: String,
    pub owner_urn: String,
    pub description: String,
    pub status: ApplicationStatus,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl DynamoRecord for ShiftApplication {
    const PREFIX: &'static str = "APPLICATION";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<ShiftApplication> {
        let id = get_s(item, "id")?;
        let status = get_s(item, "status")
            .as_deref()
            .and_then(ApplicationStatus::parse)
            .unwrap_or(ApplicationStatus::Pending);
        Some(ShiftApplication {
            id,
            shift_id: get_s(item, "shiftId").unwrap_or_default(),
            owner_urn: get_s(item, "ownerUrn").unwrap_or_default(),
            description: get_s(item, "description").unwrap_or_default(),
            status,
            created_at_ms: get_n(item, "createdAtMs"),
            updated_at_ms: get_n(item, "updatedAtMs"),
        })
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), s(&self.id));
        item.insert("shiftId".to_string(), s(&self.shift_id));
        item.insert("ownerUrn".to_string(), s(&self.owner_urn));
        item.insert("description".to_string(), s(&self.description));
        item.insert("status".to_string(), s(self.status.as_str()));
        item.insert("createdAtMs".to_string(), n(self.created_at_ms));
        item.insert("updatedAtMs".to_string(), n(self.updated_at_ms));
        item
    }
}

// ========== EVENT ==========

/// Append-only audit record written by the stream consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    pub id: String,
    pub event_urn: String,
    pub owner_urn: String,
    pub event: String,
    pub description: String,
    /// JSON snapshot of the changed item.
    pub record: serde_json::Value,
    pub created_at_ms: i64,
}

impl DynamoRecord for EventRow {
    const PREFIX: &'static str = "EVENT";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<EventRow> {
        let id = get_s(item, "id")?;
        let record = get_s(item, "record")
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(serde_json::Value::Null);
        Some(EventRow {
            id,
            event_urn: get_s(item, "eventUrn").unwrap_or_default(),
            owner_urn: get_s(item, "ownerUrn").unwrap_or_default(),
            event: get_s(item, "event").unwrap_or_default(),
            description: get_s(item, "description").unwrap_or_default(),
            record,
            created_at_ms: get_n(item, "createdAtMs"),
        })
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), s(&self.id));
        item.insert("eventUrn".to_string(), s(&self.event_urn));
        item.insert("ownerUrn".to_string(), s(&self.owner_urn));
        item.insert("event".to_string(), s(&self.event));
        item.insert("description".to_string(), s(&self.description));
        item.insert("record".to_string(), s(&self.record.to_string()));
        item.insert("createdAtMs".to_string(), n(self.created_at_ms));
        item
    }
}

// ========== REQUEST BODIES ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub allow_sms: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOrgRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMemberRequest {
    pub member_id: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFriendRequest {
    pub friendly_org_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostShiftRequest {
    pub name: Option<String>,
    pub org_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub assigned_to: Option<String>,
}

/// Partial update: an omitted field is untouched, a present field is applied
/// even when empty. Status strings that do not parse are rejected upstream.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchShiftRequest {
    pub name: Option<String>,
    pub org_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostApplicationRequest {
    pub owner_urn: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchApplicationRequest {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_status_parses_known_values_only() {
        assert_eq!(ShiftStatus::parse("open"), Some(ShiftStatus::Open));
        assert_eq!(ShiftStatus::parse("filled"), Some(ShiftStatus::Filled));
        assert_eq!(ShiftStatus::parse(""), None);
        assert_eq!(ShiftStatus::parse("OPEN"), None);
    }

    #[test]
    fn application_terminal_states() {
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(ApplicationStatus::Accepted.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
    }

    #[test]
    fn shift_item_round_trips() {
        let shift = Shift {
            id: "s1".to_string(),
            name: "Dock shift".to_string(),
            owner_urn: "urn:org:acme".to_string(),
            status: ShiftStatus::Open,
            location: "Pier 4".to_string(),
            description: "Forklift".to_string(),
            assigned_to: vec!["urn:user:u1".to_string()],
            start_time_ms: 1_700_000_000_000,
            end_time_ms: 1_700_000_360_000,
            start_date_iso: "2023-11-14T22:13:20Z".to_string(),
            end_date_iso: "2023-11-14T22:19:20Z".to_string(),
            created_at_ms: 1,
            updated_at_ms: 2,
        };
        let restored = Shift::from_item(&shift.to_item()).unwrap();
        assert_eq!(restored.owner_urn, "urn:org:acme");
        assert_eq!(restored.status, ShiftStatus::Open);
        assert_eq!(restored.assigned_to, vec!["urn:user:u1".to_string()]);
        assert_eq!(restored.start_time_ms, 1_700_000_000_000);
    }

    #[test]
    fn user_item_tolerates_missing_optional_fields() {
        let mut item = HashMap::new();
        item.insert("id".to_string(), s("u1"));
        let user = User::from_item(&item).unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.orgs.is_empty());
        assert!(user.org_roles.is_empty());
        assert!(!user.allow_sms);
    }

    #[test]
    fn from_item_requires_an_id() {
        let mut item = HashMap::new();
        item.insert("name".to_string(), s("nameless"));
        assert!(Shift::from_item(&item).is_none());
    }

    #[test]
    fn event_row_snapshot_survives_mapping() {
        let event = EventRow {
            id: "e1".to_string(),
            event_urn: "urn:shift:s1".to_string(),
            owner_urn: "urn:org:acme".to_string(),
            event: "INSERT".to_string(),
            description: "Record INSERT for shift".to_string(),
            record: serde_json::json!({"id": "s1", "status": "open"}),
            created_at_ms: 42,
        };
        let restored = EventRow::from_item(&event.to_item()).unwrap();
        assert_eq!(restored.record["status"], "open");
        assert_eq!(restored.event, "INSERT");
    }

    #[test]
    fn patch_request_distinguishes_absent_from_empty() {
        let patch: PatchShiftRequest =
            serde_json::from_str(r#"{"description": ""}"#).unwrap();
        assert_eq!(patch.description, Some(String::new()));
        assert!(patch.name.is_none());
        assert!(patch.status.is_none());
    }

    #[test]
    fn entities_serialize_camel_case() {
        let app = ShiftApplication {
            id: "a1".to_string(),
            shift_id: "s1".to_string(),
            owner_urn: "urn:user:u1".to_string(),
            description: "I can help".to_string(),
            status: ApplicationStatus::Pending,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["shiftId"], "s1");
        assert_eq!(json["ownerUrn"], "urn:user:u1");
        assert_eq!(json["status"], "pending");
    }
}
