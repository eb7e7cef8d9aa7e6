//! Account lookups behind the credential resolver.
//!
//! Accounts are owned by the registration/billing side of the product; this
//! crate only reads them. API keys are never stored or compared in clear:
//! both stores index accounts by the SHA-256 hash of the key.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::auth::hash_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub api_key_hash: String,
    pub subscription_status: String,
    pub is_active: bool,
}

impl Account {
    pub fn new(id: &str, api_key: &str, subscription_status: &str, is_active: bool) -> Self {
        Self {
            id: id.to_string(),
            api_key_hash: hash_key(api_key),
            subscription_status: subscription_status.to_string(),
            is_active,
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn lookup_by_key(&self, api_key: &str) -> Result<Option<Account>>;

    async fn lookup_by_id(&self, id: &str) -> Result<Option<Account>>;
}

/// Process-local store, used in development and tests.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<String, Account>,
    ids_by_key_hash: DashMap<String, String>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: Account) {
        self.ids_by_key_hash
            .insert(account.api_key_hash.clone(), account.id.clone());
        self.accounts.insert(account.id.clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn lookup_by_key(&self, api_key: &str) -> Result<Option<Account>> {
        let id = match self.ids_by_key_hash.get(&hash_key(api_key)) {
            Some(id) => id.value().clone(),
            None => return Ok(None),
        };
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn lookup_by_id(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.accounts.get(id).map(|a| a.value().clone()))
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    api_key_hash TEXT NOT NULL UNIQUE,
    subscription_status TEXT NOT NULL DEFAULT 'none',
    is_active INTEGER NOT NULL DEFAULT 1
)";

type AccountRow = (String, String, String, bool);

fn from_row((id, api_key_hash, subscription_status, is_active): AccountRow) -> Account {
    Account {
        id,
        api_key_hash,
        subscription_status,
        is_active,
    }
}

/// SQLite-backed store. Reads are re-issued on every lookup so tier changes
/// made by billing take effect on the next request.
#[derive(Clone)]
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert or replace an account row.
    pub async fn upsert(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (id, api_key_hash, subscription_status, is_active)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                api_key_hash = excluded.api_key_hash,
                subscription_status = excluded.subscription_status,
                is_active = excluded.is_active",
        )
        .bind(&account.id)
        .bind(&account.api_key_hash)
        .bind(&account.subscription_status)
        .bind(account.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn lookup_by_key(&self, api_key: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, api_key_hash, subscription_status, is_active
             FROM accounts WHERE api_key_hash = ?",
        )
        .bind(hash_key(api_key))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn lookup_by_id(&self, id: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, api_key_hash, subscription_status, is_active
             FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let store = InMemoryAccountStore::new();
        store.insert(Account::new("u1", "key-one-1234", "active", true));

        let by_key = store.lookup_by_key("key-one-1234").await.unwrap().unwrap();
        assert_eq!(by_key.id, "u1");
        assert_ne!(by_key.api_key_hash, "key-one-1234");

        assert!(store.lookup_by_key("nope").await.unwrap().is_none());
        assert_eq!(store.lookup_by_id("u1").await.unwrap(), Some(by_key));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_lookup_and_tier_change() {
        let store = SqliteAccountStore::connect("sqlite::memory:").await.unwrap();
        store
            .upsert(&Account::new("u7", "sqlite-key-777", "trialing", true))
            .await
            .unwrap();

        let account = store.lookup_by_key("sqlite-key-777").await.unwrap().unwrap();
        assert_eq!(account.subscription_status, "trialing");
        assert!(account.is_active);

        store
            .upsert(&Account::new("u7", "sqlite-key-777", "canceled", false))
            .await
            .unwrap();
        let account = store.lookup_by_id("u7").await.unwrap().unwrap();
        assert_eq!(account.subscription_status, "canceled");
        assert!(!account.is_active);

        assert!(store.lookup_by_key("other").await.unwrap().is_none());
    }
}
