//! Owner fan-out: resolve a pile of owner URNs to their full user/org
//! records in exactly two batch round-trips, then decorate entity lists.

use std::collections::HashMap;

use aws_sdk_dynamodb::Client as DynamoClient;
use serde::Serialize;

use crate::store::batch_get_records;
use crate::types::{Org, User};
use crate::urn::{BadUrn, Owner};

/// The resolved side of an owner URN. Exactly one of the two is set.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<Org>,
}

/// Split URNs into deduplicated user and org id lists. Owner URNs are
/// written by us, so one that does not parse is a corrupt stored reference
/// and fails the whole read loudly rather than decorating around it.
pub fn partition_urns(urns: &[String]) -> Result<(Vec<String>, Vec<String>), BadUrn> {
    let mut user_ids: Vec<String> = Vec::new();
    let mut org_ids: Vec<String> = Vec::new();

    for urn in urns {
        match Owner::parse(urn)? {
            Owner::User(id) => {
                if !user_ids.contains(&id) {
                    user_ids.push(id);
                }
            }
            Owner::Org(id) => {
                if !org_ids.contains(&id) {
                    org_ids.push(id);
                }
            }
        }
    }

    Ok((user_ids, org_ids))
}

pub fn build_entity_map(
    users: Vec<User>,
    orgs: Vec<Org>,
) -> HashMap<String, OwnerEntity> {
    let mut map = HashMap::new();
    for user in users {
        map.insert(
            Owner::user(&user.id).urn(),
            OwnerEntity {
                user: Some(user),
                org: None,
            },
        );
    }
    for org in orgs {
        map.insert(
            Owner::org(&org.id).urn(),
            OwnerEntity {
                user: None,
                org: Some(org),
            },
        );
    }
    map
}

/// Resolve owners for decoration: one BatchGetItem per entity type no matter
/// how long the input is, the two issued concurrently. Dangling references
/// simply get no entry; a corrupt URN is an error.
pub async fn resolve_owners(
    client: &DynamoClient,
    table_name: &str,
    urns: &[String],
) -> Result<HashMap<String, OwnerEntity>, BadUrn> {
    let (user_ids, org_ids) = partition_urns(urns)?;

    let (users, orgs) = tokio::join!(
        batch_get_records::<User>(client, table_name, &user_ids),
        batch_get_records::<Org>(client, table_name, &org_ids),
    );

    Ok(build_entity_map(users, orgs))
}

/// Serialize a list with each row's resolved owner attached as
/// `ownerEntity`, the shape every list endpoint returns.
pub fn decorate<T: Serialize>(
    rows: &[T],
    owner_urn_of: impl Fn(&T) -> &str,
    owners: &HashMap<String, OwnerEntity>,
) -> Vec<serde_json::Value> {
    rows.iter()
        .map(|row| {
            let mut value = serde_json::to_value(row).unwrap_or_default();
            if let Some(entity) = owners.get(owner_urn_of(row)) {
                if let serde_json::Value::Object(ref mut map) = value {
                    map.insert(
                        "ownerEntity".to_string(),
                        serde_json::to_value(entity).unwrap_or_default(),
                    );
                }
            }
            value
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShiftStatus;

    fn sample_user(id: &str) -> User {
        User {
            id: id.to_string(),
            first_name: "Ada".to_string(),
            last_name: "L".to_string(),
            email: String::new(),
            phone_number: String::new(),
            allow_sms: false,
            orgs: vec![],
            org_roles: HashMap::new(),
            shift_history: vec![],
            description: String::new(),
            location: String::new(),
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    fn sample_org(id: &str) -> Org {
        Org {
            id: id.to_string(),
            name: id.to_string(),
            owner_urn: String::new(),
            primary_members: vec![],
            friends: vec![],
            schedules: vec![],
            join_code: String::new(),
            phone_number: String::new(),
            location: String::new(),
            description: String::new(),
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn partition_deduplicates_by_type() {
        let urns = vec![
            "urn:user:u1".to_string(),
            "urn:org:acme".to_string(),
            "urn:user:u1".to_string(),
            "urn:user:u2".to_string(),
            "urn:org:acme".to_string(),
        ];
        let (users, orgs) = partition_urns(&urns).unwrap();
        assert_eq!(users, vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(orgs, vec!["acme".to_string()]);
    }

    #[test]
    fn partition_fails_closed_on_corrupt_urns() {
        let urns = vec![
            "urn:user:u1".to_string(),
            "urn:widget:w1".to_string(),
        ];
        assert_eq!(
            partition_urns(&urns).unwrap_err(),
            BadUrn("urn:widget:w1".to_string())
        );
        assert!(partition_urns(&["garbage".to_string()]).is_err());
    }

    #[test]
    fn entity_map_keys_by_urn_with_no_dangling_entries() {
        let map = build_entity_map(vec![sample_user("u1")], vec![sample_org("acme")]);
        assert!(map.get("urn:user:u1").unwrap().user.is_some());
        assert!(map.get("urn:org:acme").unwrap().org.is_some());
        assert!(map.get("urn:user:ghost").is_none());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn decorate_attaches_owner_entity() {
        let shift = crate::types::Shift {
            id: "s1".to_string(),
            name: "Dock shift".to_string(),
            owner_urn: "urn:org:acme".to_string(),
            status: ShiftStatus::Open,
            location: String::new(),
            description: String::new(),
            assigned_to: vec![],
            start_time_ms: 0,
            end_time_ms: 0,
            start_date_iso: String::new(),
            end_date_iso: String::new(),
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let owners = build_entity_map(vec![], vec![sample_org("acme")]);
        let rows = decorate(&[shift], |s| &s.owner_urn, &owners);
        assert_eq!(rows[0]["ownerEntity"]["org"]["id"], "acme");
        assert_eq!(rows[0]["name"], "Dock shift");
    }

    #[test]
    fn decorate_skips_dangling_owners() {
        let app = crate::types::ShiftApplication {
            id: "a1".to_string(),
            shift_id: "s1".to_string(),
            owner_urn: "urn:user:gone".to_string(),
            description: String::new(),
            status: crate::types::ApplicationStatus::Pending,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let owners = build_entity_map(vec![], vec![]);
        let rows = decorate(&[app], |a| &a.owner_urn, &owners);
        assert!(rows[0].get("ownerEntity").is_none());
    }
}
