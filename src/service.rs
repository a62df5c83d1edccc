use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::ServiceError,
    models::{
        AdminType, AdminTypeSelector, CredentialRecord, ReplaceUserRequest, UpdateUserRequest,
        UserEntry,
    },
    repository::RepositoryState,
};

/// CredentialService
///
/// The business logic around the credential store: password hashing,
/// uniqueness enforcement, and the add / authenticate / list / update /
/// delete operations exposed by the endpoint layer.
///
/// Conflict checks always run over the *complete* set of requested keys
/// before anything is written, and the repository commits multi-record
/// writes transactionally, so a rejected call never leaves partial state
/// behind.
#[derive(Clone)]
pub struct CredentialService {
    repo: RepositoryState,
    hash_cost: u32,
}

impl CredentialService {
    /// Creates a service with the production bcrypt cost.
    pub fn new(repo: RepositoryState) -> Self {
        Self::with_hash_cost(repo, bcrypt::DEFAULT_COST)
    }

    /// Creates a service with an explicit bcrypt cost. Tests use the minimum
    /// cost to keep hashing fast.
    pub fn with_hash_cost(repo: RepositoryState, hash_cost: u32) -> Self {
        Self { repo, hash_cost }
    }

    /// authenticate
    ///
    /// Verifies a (username, password, admin type) triple against the store.
    /// The admin type participates in the lookup key, so a credential
    /// provisioned for one administrative area cannot log into the other.
    ///
    /// A missing record and a wrong password both surface as
    /// `InvalidCredentials`; the caller cannot tell which part failed.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        admin_type: &str,
    ) -> Result<AdminType, ServiceError> {
        if username.is_empty() || password.is_empty() || admin_type.is_empty() {
            return Err(ServiceError::Validation("Missing fields".to_string()));
        }
        let admin_type: AdminType = admin_type.parse()?;

        let record = self
            .repo
            .find(username, admin_type)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if bcrypt::verify(password, &record.password_hash)? {
            Ok(admin_type)
        } else {
            Err(ServiceError::InvalidCredentials)
        }
    }

    /// add_user
    ///
    /// Creates one credential record per requested admin type, all sharing a
    /// single hash of the given password. Every requested (username, type)
    /// pair is checked for conflicts before any insert runs; the inserts
    /// themselves are committed in one transaction.
    ///
    /// Returns the number of records created.
    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        admin_types: &AdminTypeSelector,
    ) -> Result<usize, ServiceError> {
        if username.is_empty() || password.is_empty() {
            return Err(ServiceError::Validation("Missing fields".to_string()));
        }
        let admin_types = admin_types.normalize()?;
        if admin_types.is_empty() {
            return Err(ServiceError::Validation(
                "No admin types supplied".to_string(),
            ));
        }

        // Validate every key first so a late conflict cannot strand earlier
        // inserts of the same call.
        for admin_type in &admin_types {
            if self.repo.find(username, *admin_type).await?.is_some() {
                return Err(ServiceError::Conflict(*admin_type));
            }
        }

        let password_hash = bcrypt::hash(password, self.hash_cost)?;
        let records: Vec<CredentialRecord> = admin_types
            .iter()
            .map(|admin_type| CredentialRecord {
                username: username.to_string(),
                password_hash: password_hash.clone(),
                admin_type: *admin_type,
            })
            .collect();

        self.repo.insert_many(&records).await?;
        tracing::info!(username, count = records.len(), "credentials added");
        Ok(records.len())
    }

    /// list_users
    ///
    /// The grouped listing: every record collapsed by username, with the
    /// granted admin types collected per user. Ordered by username for a
    /// stable response.
    pub async fn list_users(&self) -> Result<Vec<UserEntry>, ServiceError> {
        let mut grouped: BTreeMap<String, BTreeSet<AdminType>> = BTreeMap::new();
        for record in self.repo.list().await? {
            grouped
                .entry(record.username)
                .or_default()
                .insert(record.admin_type);
        }

        Ok(grouped
            .into_iter()
            .map(|(username, admin_types)| UserEntry {
                username,
                admin_type: admin_types.into_iter().collect(),
            })
            .collect())
    }

    /// delete_user
    ///
    /// Two granularities: with an admin type, exactly that record is removed
    /// and sibling records of the same username stay untouched; without one,
    /// every record of the username goes. `NotFound` when nothing matched.
    pub async fn delete_user(
        &self,
        username: &str,
        admin_type: Option<AdminType>,
    ) -> Result<(), ServiceError> {
        let removed = match admin_type {
            Some(admin_type) => self.repo.delete(username, admin_type).await?,
            None => self.repo.delete_all(username).await? > 0,
        };
        if removed {
            tracing::info!(username, "credentials deleted");
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }

    /// update_user
    ///
    /// Single-record update (variant targeting one (username, admin type)
    /// key): applies any of the optional changes in place. A supplied
    /// password is re-hashed; moving the record onto a key that already
    /// exists is a conflict. Empty strings count as "not supplied".
    pub async fn update_user(
        &self,
        username: &str,
        admin_type: AdminType,
        changes: &UpdateUserRequest,
    ) -> Result<(), ServiceError> {
        let record = self
            .repo
            .find(username, admin_type)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let new_username = non_empty(changes.new_username.as_deref()).unwrap_or(username);
        let new_admin_type = match non_empty(changes.new_admin_type.as_deref()) {
            Some(raw) => raw.parse()?,
            None => admin_type,
        };

        // A key change must not collide with another existing record.
        if (new_username, new_admin_type) != (username, admin_type)
            && self.repo.find(new_username, new_admin_type).await?.is_some()
        {
            return Err(ServiceError::Conflict(new_admin_type));
        }

        let password_hash = match non_empty(changes.new_password.as_deref()) {
            Some(password) => bcrypt::hash(password, self.hash_cost)?,
            None => record.password_hash,
        };

        let updated = CredentialRecord {
            username: new_username.to_string(),
            password_hash,
            admin_type: new_admin_type,
        };
        if self.repo.update(username, admin_type, updated).await? {
            tracing::info!(username, "credential updated");
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }

    /// replace_user
    ///
    /// Whole-username update: every record of the old username is replaced
    /// by one record per requested admin type, optionally under a new name.
    ///
    /// Password resolution: a supplied password is hashed once and used for
    /// every new record. Without one, each requested type must have existed
    /// under the old username so its hash can be carried forward; requesting
    /// a brand-new type without a password is rejected, since the resulting
    /// record would have no valid credential material.
    pub async fn replace_user(&self, request: &ReplaceUserRequest) -> Result<(), ServiceError> {
        let old_username = non_empty(request.username.as_deref())
            .ok_or_else(|| ServiceError::Validation("Missing fields".to_string()))?;
        let selector = request
            .admin_type
            .as_ref()
            .ok_or_else(|| ServiceError::Validation("Missing fields".to_string()))?;
        let admin_types = selector.normalize()?;
        if admin_types.is_empty() {
            return Err(ServiceError::Validation(
                "No admin types supplied".to_string(),
            ));
        }

        let existing = self.repo.list_for(old_username).await?;
        if existing.is_empty() {
            return Err(ServiceError::NotFound);
        }

        let new_username = non_empty(request.new_username.as_deref()).unwrap_or(old_username);

        // Rename conflicts: every target key must be free of records that
        // belong to someone else. The old user's own records are about to be
        // deleted in the same transaction, so they do not count.
        if new_username != old_username {
            for admin_type in &admin_types {
                if self.repo.find(new_username, *admin_type).await?.is_some() {
                    return Err(ServiceError::Conflict(*admin_type));
                }
            }
        }

        let fresh_hash = match non_empty(request.new_password.as_deref()) {
            Some(password) => Some(bcrypt::hash(password, self.hash_cost)?),
            None => None,
        };

        let mut records = Vec::with_capacity(admin_types.len());
        for admin_type in &admin_types {
            let password_hash = match &fresh_hash {
                Some(hash) => hash.clone(),
                None => existing
                    .iter()
                    .find(|r| r.admin_type == *admin_type)
                    .map(|r| r.password_hash.clone())
                    .ok_or_else(|| {
                        ServiceError::Validation(
                            "A password is required when adding new admin types".to_string(),
                        )
                    })?,
            };
            records.push(CredentialRecord {
                username: new_username.to_string(),
                password_hash,
                admin_type: *admin_type,
            });
        }

        self.repo.replace_all(old_username, &records).await?;
        tracing::info!(
            old_username,
            new_username,
            count = records.len(),
            "credentials replaced"
        );
        Ok(())
    }
}

/// Collapses `None` and empty strings, the way the original portal's form
/// handler treated blank inputs.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
