//! In-memory [`AccountStore`] for tests and local runs.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{AccountStore, Group, GroupMembership, NewUser, Service, User};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    services: Vec<Service>,
    groups: Vec<Group>,
    // (group_id, user_id, admin)
    group_users: Vec<(i64, i64, bool)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise persistence error paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn add_service(&self, name: &str, access: &str, secret_digest: &str) -> i64 {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.services.push(Service {
            id,
            name: name.to_string(),
            access: access.to_string(),
            secret: secret_digest.to_string(),
        });
        id
    }

    pub async fn add_user(&self, dom_name: &str, seed: &str) -> i64 {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.users.push(User {
            id,
            dom_name: dom_name.to_string(),
            full_name: None,
            email: None,
            seed: seed.to_string(),
        });
        id
    }

    pub async fn add_group(&self, name: &str, description: Option<&str>) -> i64 {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.groups.push(Group {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
        });
        id
    }

    pub async fn add_member(&self, group_id: i64, user_id: i64, admin: bool) {
        self.tables
            .write()
            .await
            .group_users
            .push((group_id, user_id, admin));
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn service_by_access(&self, access: &str) -> Result<Option<Service>> {
        let tables = self.tables.read().await;
        Ok(tables.services.iter().find(|s| s.access == access).cloned())
    }

    async fn user_by_dom_name(&self, dom_name: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.dom_name == dom_name).cloned())
    }

    async fn group_memberships(&self, user_id: i64) -> Result<Vec<GroupMembership>> {
        let tables = self.tables.read().await;
        let mut memberships: Vec<GroupMembership> = tables
            .group_users
            .iter()
            .filter(|(_, uid, _)| *uid == user_id)
            .filter_map(|(gid, _, admin)| {
                tables
                    .groups
                    .iter()
                    .find(|g| g.id == *gid)
                    .map(|group| GroupMembership {
                        group: group.clone(),
                        admin: *admin,
                    })
            })
            .collect();
        memberships.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        Ok(memberships)
    }

    async fn insert_user(&self, user: NewUser) -> Result<i64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("write rejected by memory store"));
        }
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.dom_name == user.dom_name) {
            return Err(anyhow!("duplicate dom_name {}", user.dom_name));
        }
        let id = tables.next_id();
        tables.users.push(User {
            id,
            dom_name: user.dom_name,
            full_name: user.full_name,
            email: user.email,
            seed: user.seed,
        });
        Ok(id)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
