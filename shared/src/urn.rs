use std::fmt;

/// Polymorphic owner reference: every shift, application and event is owned
/// by either a user or an org, stored as `urn:user:<id>` / `urn:org:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    User(String),
    Org(String),
}

/// A URN that does not match `urn:(user|org):<id>`. Stored references are
/// written by us, so hitting this means a corrupt record, not bad user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadUrn(pub String);

impl fmt::Display for BadUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized entity urn: {}", self.0)
    }
}

impl std::error::Error for BadUrn {}

impl Owner {
    pub fn parse(urn: &str) -> Result<Owner, BadUrn> {
        let mut parts = urn.splitn(3, ':');
        let scheme = parts.next().unwrap_or("");
        let entity_type = parts.next().unwrap_or("");
        let id = parts.next().unwrap_or("");

        if scheme != "urn" || id.is_empty() {
            return Err(BadUrn(urn.to_string()));
        }

        match entity_type {
            "user" => Ok(Owner::User(id.to_string())),
            "org" => Ok(Owner::Org(id.to_string())),
            _ => Err(BadUrn(urn.to_string())),
        }
    }

    pub fn user(id: &str) -> Owner {
        Owner::User(id.to_string())
    }

    pub fn org(id: &str) -> Owner {
        Owner::Org(id.to_string())
    }

    pub fn id(&self) -> &str {
        match self {
            Owner::User(id) | Owner::Org(id) => id,
        }
    }

    pub fn urn(&self) -> String {
        match self {
            Owner::User(id) => format!("urn:user:{}", id),
            Owner::Org(id) => format!("urn:org:{}", id),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.urn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_urn() {
        let owner = Owner::parse("urn:user:abc-123").unwrap();
        assert_eq!(owner, Owner::User("abc-123".to_string()));
        assert_eq!(owner.id(), "abc-123");
    }

    #[test]
    fn parses_org_urn() {
        let owner = Owner::parse("urn:org:acme").unwrap();
        assert_eq!(owner, Owner::Org("acme".to_string()));
        assert_eq!(owner.urn(), "urn:org:acme");
    }

    #[test]
    fn rejects_unknown_entity_type() {
        assert!(Owner::parse("urn:schedule:s1").is_err());
        assert!(Owner::parse("urn::x").is_err());
    }

    #[test]
    fn rejects_malformed_urns() {
        assert!(Owner::parse("").is_err());
        assert!(Owner::parse("user:abc").is_err());
        assert!(Owner::parse("urn:user").is_err());
        assert!(Owner::parse("urn:user:").is_err());
    }

    #[test]
    fn display_round_trips() {
        let urn = "urn:user:u1";
        assert_eq!(Owner::parse(urn).unwrap().to_string(), urn);
    }
}
