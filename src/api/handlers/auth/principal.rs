//! Principals that can log in and the identities resolved for requests.

/// Registry key and session username of the administrator.
pub const ADMIN_NAME: &str = "admin";

/// Sentinel id stored in admin sessions.
pub const ADMIN_ID: i64 = i64::MAX;

/// Who a credential verifier recognised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Principal {
    Admin,
    Service { id: i64, name: String },
    /// Directory user; the portal record is resolved on each request.
    User { name: String },
}

impl Principal {
    /// Registry key and token subject.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Admin => ADMIN_NAME,
            Self::Service { name, .. } | Self::User { name } => name,
        }
    }
}

/// Identity behind a validated bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Admin,
    Service { id: i64, name: String },
    User { id: i64, dom_name: String },
}

impl Identity {
    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Admin => ADMIN_ID,
            Self::Service { id, .. } | Self::User { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Admin => ADMIN_NAME,
            Self::Service { name, .. } => name,
            Self::User { dom_name, .. } => dom_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_names_key_the_registry() {
        assert_eq!(Principal::Admin.name(), "admin");
        assert_eq!(
            Principal::Service {
                id: 7,
                name: "billing".to_string()
            }
            .name(),
            "billing"
        );
        assert_eq!(
            Principal::User {
                name: "alice".to_string()
            }
            .name(),
            "alice"
        );
    }

    #[test]
    fn admin_identity_uses_sentinel_id() {
        assert_eq!(Identity::Admin.id(), i64::MAX);
        assert_eq!(
            Identity::User {
                id: 3,
                dom_name: "bob".to_string()
            }
            .id(),
            3
        );
    }
}
