//! PostgreSQL implementation of [`AccountStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use tracing::{Instrument, info_span};

use super::{AccountStore, Group, GroupMembership, NewUser, Service, User};

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn service_by_access(&self, access: &str) -> Result<Option<Service>> {
        let query = "SELECT id, name, access, secret FROM services WHERE access = $1";
        let row = sqlx::query(query)
            .bind(access)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup service")?;

        Ok(row.map(|row| Service {
            id: row.get("id"),
            name: row.get("name"),
            access: row.get("access"),
            secret: row.get::<String, _>("secret").trim().to_string(),
        }))
    }

    async fn user_by_dom_name(&self, dom_name: &str) -> Result<Option<User>> {
        let query = "SELECT id, dom_name, full_name, email, seed FROM users WHERE dom_name = $1";
        let row = sqlx::query(query)
            .bind(dom_name)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user")?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            dom_name: row.get("dom_name"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            seed: row.get("seed"),
        }))
    }

    async fn group_memberships(&self, user_id: i64) -> Result<Vec<GroupMembership>> {
        let query = r"
            SELECT g.id, g.name, g.description, gu.admin
            FROM group_users gu
            JOIN groups g ON g.id = gu.group_id
            WHERE gu.user_id = $1
            ORDER BY g.name
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list group memberships")?;

        Ok(rows
            .into_iter()
            .map(|row| GroupMembership {
                group: Group {
                    id: row.get("id"),
                    name: row.get("name"),
                    description: row.get("description"),
                },
                admin: row.get("admin"),
            })
            .collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<i64> {
        let query = r"
            INSERT INTO users (dom_name, full_name, email, seed)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(&user.dom_name)
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(&user.seed)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert user")?;

        Ok(row.get("id"))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await
            .context("failed to ping database")
    }
}
