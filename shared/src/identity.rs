//! Identity lifecycle bridge: turn an external account-confirmation event
//! into an internal User record, exactly once per subject id.

use std::collections::HashMap;

use aws_sdk_dynamodb::Client as DynamoClient;

use crate::store::{get_record, put_record};
use crate::types::User;

/// Build the initial User from the identity provider's attribute bag.
/// `allowSms` follows from whether a phone number came through; org
/// membership starts empty.
pub fn user_from_identity(
    subject_id: &str,
    attributes: &HashMap<String, String>,
) -> User {
    let attr = |key: &str| attributes.get(key).cloned().unwrap_or_default();
    let phone_number = attr("phone_number");
    let now = chrono::Utc::now().timestamp_millis();

    User {
        id: subject_id.to_string(),
        first_name: attr("given_name"),
        last_name: attr("family_name"),
        email: attr("email"),
        allow_sms: !phone_number.is_empty(),
        phone_number,
        orgs: vec![],
        org_roles: HashMap::new(),
        shift_history: vec![],
        description: String::new(),
        location: String::new(),
        created_at_ms: now,
        updated_at_ms: now,
    }
}

/// The two store calls provisioning needs, seamed so the fire-twice
/// guarantee is testable without a live table.
trait UserRepo {
    async fn find(&self, subject_id: &str) -> Option<User>;
    async fn create(&self, user: &User) -> bool;
}

struct DynamoUsers<'a> {
    client: &'a DynamoClient,
    table_name: &'a str,
}

impl UserRepo for DynamoUsers<'_> {
    async fn find(&self, subject_id: &str) -> Option<User> {
        get_record(self.client, self.table_name, subject_id).await
    }

    async fn create(&self, user: &User) -> bool {
        put_record(self.client, self.table_name, user).await
    }
}

async fn provision_with<R: UserRepo>(
    repo: &R,
    subject_id: &str,
    attributes: &HashMap<String, String>,
) -> bool {
    tracing::info!("Checking if user {} exists", subject_id);
    if repo.find(subject_id).await.is_some() {
        tracing::warn!(
            "User {} already exists, confirmation fired twice",
            subject_id
        );
        return true;
    }

    let user = user_from_identity(subject_id, attributes);
    tracing::info!("Creating user {}", subject_id);
    repo.create(&user).await
}

/// Idempotent provisioning: the provider can fire the same confirmation more
/// than once, so an existing record means there is nothing to do.
pub async fn provision_user(
    client: &DynamoClient,
    table_name: &str,
    subject_id: &str,
    attributes: &HashMap<String, String>,
) -> bool {
    let repo = DynamoUsers { client, table_name };
    provision_with(&repo, subject_id, attributes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn attributes(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct MemoryUsers {
        rows: RefCell<HashMap<String, User>>,
    }

    impl UserRepo for MemoryUsers {
        async fn find(&self, subject_id: &str) -> Option<User> {
            self.rows.borrow().get(subject_id).cloned()
        }

        async fn create(&self, user: &User) -> bool {
            self.rows.borrow_mut().insert(user.id.clone(), user.clone());
            true
        }
    }

    #[test]
    fn allow_sms_follows_phone_presence() {
        let with_phone = user_from_identity(
            "u1",
            &attributes(&[
                ("given_name", "Ada"),
                ("family_name", "Lovelace"),
                ("email", "ada@example.com"),
                ("phone_number", "+15550001111"),
            ]),
        );
        assert!(with_phone.allow_sms);
        assert_eq!(with_phone.phone_number, "+15550001111");

        let without_phone =
            user_from_identity("u2", &attributes(&[("email", "g@example.com")]));
        assert!(!without_phone.allow_sms);
        assert!(without_phone.phone_number.is_empty());
    }

    #[test]
    fn new_users_start_with_no_memberships() {
        let user = user_from_identity("u1", &attributes(&[("given_name", "Ada")]));
        assert_eq!(user.id, "u1");
        assert_eq!(user.first_name, "Ada");
        assert!(user.orgs.is_empty());
        assert!(user.org_roles.is_empty());
        assert!(user.shift_history.is_empty());
    }

    #[tokio::test]
    async fn confirmation_firing_twice_creates_one_row() {
        let repo = MemoryUsers {
            rows: RefCell::new(HashMap::new()),
        };
        let attrs =
            attributes(&[("given_name", "Ada"), ("phone_number", "+15550001111")]);

        assert!(provision_with(&repo, "u1", &attrs).await);
        assert_eq!(repo.rows.borrow().len(), 1);

        // The second event must leave the existing row alone, including any
        // edits made since the first.
        repo.rows.borrow_mut().get_mut("u1").unwrap().first_name = "Edited".to_string();

        assert!(provision_with(&repo, "u1", &attrs).await);
        let rows = repo.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.get("u1").unwrap().first_name, "Edited");
    }
}
