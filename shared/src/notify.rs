//! SMS notifications for the application lifecycle. Every step in the chain
//! (shift, owner, phone number) is allowed to be missing: a broken link
//! skips the notification instead of failing the operation that triggered it.

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sns::Client as SnsClient;

use crate::sms::send_sms;
use crate::store::get_record;
use crate::types::{ApplicationStatus, Org, Shift, ShiftApplication, User};
use crate::urn::Owner;

const SITE_URL: &str = "https://www.laborpool.app";

/// A resolved owner: the user or org behind a URN, viewed uniformly for
/// messaging purposes.
pub enum Party {
    User(User),
    Org(Org),
}

impl Party {
    pub fn name(&self) -> String {
        match self {
            Party::User(user) => user.full_name(),
            Party::Org(org) => org.name.clone(),
        }
    }

    pub fn profile_url(&self) -> String {
        match self {
            Party::User(user) => format!("{}/user/{}", SITE_URL, user.id),
            Party::Org(org) => format!("{}/org/{}", SITE_URL, org.id),
        }
    }

    pub fn phone_number(&self) -> &str {
        match self {
            Party::User(user) => &user.phone_number,
            Party::Org(org) => &org.phone_number,
        }
    }
}

/// Resolve a URN to its entity. A corrupt or dangling reference is a skip
/// here, not an error; the audit trail is the place that notices.
pub async fn fetch_party(
    client: &DynamoClient,
    table_name: &str,
    urn: &str,
) -> Option<Party> {
    match Owner::parse(urn) {
        Ok(Owner::User(id)) => get_record::<User>(client, table_name, &id)
            .await
            .map(Party::User),
        Ok(Owner::Org(id)) => get_record::<Org>(client, table_name, &id)
            .await
            .map(Party::Org),
        Err(bad) => {
            tracing::warn!("Skipping notification, {}", bad);
            None
        }
    }
}

pub fn new_application_message(
    host_name: &str,
    shift_name: &str,
    applicant_name: &str,
    applicant_description: &str,
    applicant_url: &str,
) -> String {
    format!(
        "Hey {host_name}, you have a new application for your shift!\n\
Here are the details:\n\
  - Shift name: {shift_name}\n\
\n\
  - Applicant name: {applicant_name}\n\
  - Applicant description: {applicant_description}\n\
\n\
Visit {applicant_url} to find the applicant's contact info and reach out directly if you have any questions."
    )
}

pub fn outcome_message(
    status: ApplicationStatus,
    shift: &Shift,
    host_name: &str,
    host_url: &str,
) -> String {
    match status {
        ApplicationStatus::Accepted => format!(
            "Hi, you've been confirmed for an opening!\n\
Here are the details:\n\
  - Opening name: {}\n\
  - Opening description: {}\n\
  - Host: {}\n\
  - Location: {}\n\
  - Starts: {}\n\
\n\
Visit {} to find the host's contact info and reach out directly if you have any questions.",
            shift.name,
            shift.description,
            host_name,
            shift.location,
            shift.start_date_iso,
            host_url,
        ),
        _ => format!(
            "You are no longer needed for an opening.\n\
Visit {} to find the host's contact info and reach out directly if you have any questions.",
            host_url,
        ),
    }
}

/// Tell the shift's owner someone applied. Best-effort.
pub async fn notify_owner_of_application(
    dynamo: &DynamoClient,
    sns: &SnsClient,
    table_name: &str,
    application: &ShiftApplication,
) {
    let Some(applicant) = fetch_party(dynamo, table_name, &application.owner_urn).await
    else {
        return;
    };

    let Some(shift) =
        get_record::<Shift>(dynamo, table_name, &application.shift_id).await
    else {
        return;
    };

    let Some(host) = fetch_party(dynamo, table_name, &shift.owner_urn).await else {
        return;
    };

    let message = new_application_message(
        &host.name(),
        &shift.name,
        &applicant.name(),
        &application.description,
        &applicant.profile_url(),
    );

    if let Err(e) = send_sms(sns, host.phone_number(), &message).await {
        tracing::warn!("Skipping new-application SMS: {}", e);
    }
}

/// Tell the applicant how their application was decided. Best-effort.
pub async fn notify_applicant_of_outcome(
    dynamo: &DynamoClient,
    sns: &SnsClient,
    table_name: &str,
    application: &ShiftApplication,
    status: ApplicationStatus,
) {
    let Some(shift) =
        get_record::<Shift>(dynamo, table_name, &application.shift_id).await
    else {
        return;
    };

    let Some(host) = fetch_party(dynamo, table_name, &shift.owner_urn).await else {
        return;
    };

    let Some(applicant) = fetch_party(dynamo, table_name, &application.owner_urn).await
    else {
        return;
    };

    let message = outcome_message(status, &shift, &host.name(), &host.profile_url());

    if let Err(e) = send_sms(sns, applicant.phone_number(), &message).await {
        tracing::warn!("Skipping outcome SMS: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShiftStatus;

    fn sample_shift() -> Shift {
        Shift {
            id: "s1".to_string(),
            name: "Dock shift".to_string(),
            owner_urn: "urn:org:acme".to_string(),
            status: ShiftStatus::Open,
            location: "Pier 4".to_string(),
            description: "Forklift".to_string(),
            assigned_to: vec![],
            start_time_ms: 0,
            end_time_ms: 0,
            start_date_iso: "2026-09-01T08:00:00Z".to_string(),
            end_date_iso: "2026-09-01T16:00:00Z".to_string(),
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn application_message_names_shift_and_applicant() {
        let message = new_application_message(
            "Acme",
            "Dock shift",
            "Ada Lovelace",
            "I can help",
            "https://www.laborpool.app/user/u1",
        );
        assert!(message.contains("Hey Acme"));
        assert!(message.contains("Shift name: Dock shift"));
        assert!(message.contains("Applicant name: Ada Lovelace"));
        assert!(message.contains("/user/u1"));
    }

    #[test]
    fn accepted_message_includes_host_details() {
        let message = outcome_message(
            ApplicationStatus::Accepted,
            &sample_shift(),
            "Acme",
            "https://www.laborpool.app/org/acme",
        );
        assert!(message.contains("confirmed for an opening"));
        assert!(message.contains("Host: Acme"));
        assert!(message.contains("Location: Pier 4"));
        assert!(message.contains("Starts: 2026-09-01T08:00:00Z"));
    }

    #[test]
    fn rejected_message_is_short() {
        let message = outcome_message(
            ApplicationStatus::Rejected,
            &sample_shift(),
            "Acme",
            "https://www.laborpool.app/org/acme",
        );
        assert!(message.contains("no longer needed"));
        assert!(!message.contains("Dock shift"));
    }

    #[test]
    fn party_exposes_org_phone_number() {
        let org = Org {
            id: "acme".to_string(),
            name: "Acme".to_string(),
            owner_urn: String::new(),
            primary_members: vec![],
            friends: vec![],
            schedules: vec![],
            join_code: String::new(),
            phone_number: "+15550001111".to_string(),
            location: String::new(),
            description: String::new(),
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let party = Party::Org(org);
        assert_eq!(party.phone_number(), "+15550001111");
        assert_eq!(party.profile_url(), "https://www.laborpool.app/org/acme");
    }
}
