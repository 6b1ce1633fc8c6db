//! Account persistence: users, services, groups and group memberships.
//!
//! Handlers and verifiers only see the [`AccountStore`] trait. The server wires
//! in [`PgAccountStore`]; tests use [`MemoryAccountStore`].

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use anyhow::Result;
use async_trait::async_trait;

/// A directory user known to the portal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub dom_name: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    /// Base32 TOTP seed.
    pub seed: String,
}

/// A machine client authenticating with an access code and shared secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub access: String,
    /// Lowercase hex SHA-256 digest of the shared secret.
    pub secret: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A group the user belongs to and whether they administer it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMembership {
    pub group: Group,
    pub admin: bool,
}

/// Fields required to create a user record.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub dom_name: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub seed: String,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find a service by its access code.
    async fn service_by_access(&self, access: &str) -> Result<Option<Service>>;

    /// Find a user by domain name.
    async fn user_by_dom_name(&self, dom_name: &str) -> Result<Option<User>>;

    /// All group memberships of a user.
    async fn group_memberships(&self, user_id: i64) -> Result<Vec<GroupMembership>>;

    /// Persist a new user and return its id.
    async fn insert_user(&self, user: NewUser) -> Result<i64>;

    /// Cheap reachability check used by `/health`.
    async fn ping(&self) -> Result<()>;
}
