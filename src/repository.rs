use crate::models::{AdminType, CredentialRecord};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};

/// CredentialRepository Trait
///
/// The abstract contract for all persistence operations on credential
/// records. The service layer interacts with the store exclusively through
/// this trait, so the concrete backend (Postgres, in-memory) can be swapped
/// for tests or future storage engines.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn CredentialRepository>`) safely shareable across Axum's
/// asynchronous task boundaries.
///
/// Multi-record writes (`insert_many`, `replace_all`) must be atomic: either
/// every record lands or none does. Conflict *detection* is the service's
/// job; implementations only guarantee the storage-level uniqueness of the
/// (username, admin_type) key.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Looks up the unique record for a (username, admin type) pair.
    async fn find(
        &self,
        username: &str,
        admin_type: AdminType,
    ) -> Result<Option<CredentialRecord>, sqlx::Error>;

    /// Returns every record in the store.
    async fn list(&self) -> Result<Vec<CredentialRecord>, sqlx::Error>;

    /// Returns every record held by one username, across all admin types.
    async fn list_for(&self, username: &str) -> Result<Vec<CredentialRecord>, sqlx::Error>;

    /// Inserts all given records atomically.
    async fn insert_many(&self, records: &[CredentialRecord]) -> Result<(), sqlx::Error>;

    /// Rewrites the record identified by (username, admin type) with the new
    /// field values. Returns false when no such record exists.
    async fn update(
        &self,
        username: &str,
        admin_type: AdminType,
        record: CredentialRecord,
    ) -> Result<bool, sqlx::Error>;

    /// Removes exactly one record. Returns false when no such record exists.
    async fn delete(&self, username: &str, admin_type: AdminType) -> Result<bool, sqlx::Error>;

    /// Removes every record for a username. Returns the number removed.
    async fn delete_all(&self, username: &str) -> Result<u64, sqlx::Error>;

    /// Atomically deletes every record of `old_username` and inserts the
    /// given replacement records (which may carry a different username).
    async fn replace_all(
        &self,
        old_username: &str,
        records: &[CredentialRecord],
    ) -> Result<(), sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn CredentialRepository>;

/// PostgresRepository
///
/// The production implementation of `CredentialRepository`, backed by the
/// `login_users` table. The composite primary key (username, admin_type)
/// backstops the uniqueness invariant even under concurrent writers.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PostgresRepository {
    async fn find(
        &self,
        username: &str,
        admin_type: AdminType,
    ) -> Result<Option<CredentialRecord>, sqlx::Error> {
        sqlx::query_as::<_, CredentialRecord>(
            "SELECT username, password_hash, admin_type FROM login_users \
             WHERE username = $1 AND admin_type = $2",
        )
        .bind(username)
        .bind(admin_type)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, sqlx::Error> {
        sqlx::query_as::<_, CredentialRecord>(
            "SELECT username, password_hash, admin_type FROM login_users \
             ORDER BY username, admin_type",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn list_for(&self, username: &str) -> Result<Vec<CredentialRecord>, sqlx::Error> {
        sqlx::query_as::<_, CredentialRecord>(
            "SELECT username, password_hash, admin_type FROM login_users \
             WHERE username = $1 ORDER BY admin_type",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
    }

    /// insert_many
    ///
    /// All inserts run inside one transaction so a conflicting record cannot
    /// leave earlier inserts of the same call behind.
    async fn insert_many(&self, records: &[CredentialRecord]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO login_users (username, password_hash, admin_type) \
                 VALUES ($1, $2, $3)",
            )
            .bind(&record.username)
            .bind(&record.password_hash)
            .bind(record.admin_type)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }

    async fn update(
        &self,
        username: &str,
        admin_type: AdminType,
        record: CredentialRecord,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE login_users \
             SET username = $3, password_hash = $4, admin_type = $5 \
             WHERE username = $1 AND admin_type = $2",
        )
        .bind(username)
        .bind(admin_type)
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(record.admin_type)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, username: &str, admin_type: AdminType) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM login_users WHERE username = $1 AND admin_type = $2")
                .bind(username)
                .bind(admin_type)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, username: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM login_users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// replace_all
    ///
    /// The delete and every insert share one transaction, so the
    /// whole-username update is all-or-nothing.
    async fn replace_all(
        &self,
        old_username: &str,
        records: &[CredentialRecord],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM login_users WHERE username = $1")
            .bind(old_username)
            .execute(&mut *tx)
            .await?;
        for record in records {
            sqlx::query(
                "INSERT INTO login_users (username, password_hash, admin_type) \
                 VALUES ($1, $2, $3)",
            )
            .bind(&record.username)
            .bind(&record.password_hash)
            .bind(record.admin_type)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }
}

/// InMemoryRepository
///
/// A self-contained implementation of `CredentialRepository` over a mutex'd
/// vector. Used as the injectable test double for the service, handler, and
/// end-to-end tests, which must run without a live database.
#[derive(Default)]
pub struct InMemoryRepository {
    records: Mutex<Vec<CredentialRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CredentialRecord>> {
        // Recover the inner data on poison; records are plain values.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CredentialRepository for InMemoryRepository {
    async fn find(
        &self,
        username: &str,
        admin_type: AdminType,
    ) -> Result<Option<CredentialRecord>, sqlx::Error> {
        Ok(self
            .lock()
            .iter()
            .find(|r| r.username == username && r.admin_type == admin_type)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, sqlx::Error> {
        Ok(self.lock().clone())
    }

    async fn list_for(&self, username: &str) -> Result<Vec<CredentialRecord>, sqlx::Error> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.username == username)
            .cloned()
            .collect())
    }

    async fn insert_many(&self, records: &[CredentialRecord]) -> Result<(), sqlx::Error> {
        self.lock().extend_from_slice(records);
        Ok(())
    }

    async fn update(
        &self,
        username: &str,
        admin_type: AdminType,
        record: CredentialRecord,
    ) -> Result<bool, sqlx::Error> {
        let mut records = self.lock();
        match records
            .iter_mut()
            .find(|r| r.username == username && r.admin_type == admin_type)
        {
            Some(existing) => {
                *existing = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, username: &str, admin_type: AdminType) -> Result<bool, sqlx::Error> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| !(r.username == username && r.admin_type == admin_type));
        Ok(records.len() < before)
    }

    async fn delete_all(&self, username: &str) -> Result<u64, sqlx::Error> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.username != username);
        Ok((before - records.len()) as u64)
    }

    async fn replace_all(
        &self,
        old_username: &str,
        records: &[CredentialRecord],
    ) -> Result<(), sqlx::Error> {
        let mut store = self.lock();
        store.retain(|r| r.username != old_username);
        store.extend_from_slice(records);
        Ok(())
    }
}
