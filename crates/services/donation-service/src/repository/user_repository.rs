//! User repository: sealed personal fields and blind-index lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::crypto::FieldCipher;
use common::{AppError, AppResult};
use domain::{User, UserRole};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Plaintext data for a user row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub name: String,
    pub email: Option<String>,
    pub external_id: Option<String>,
    pub is_admin: bool,
}

/// Fields to change on an existing user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub external_id: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.external_id.is_none()
    }
}

/// User repository trait for dependency injection.
///
/// Lookups by email or external identity go through the blind index; the
/// returned users carry decrypted values.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by exact display name
    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>>;

    /// Find user by external identity (via blind index)
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>>;

    /// Find user by email (via blind index)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Display names for a set of user IDs
    async fn names_by_ids(&self, ids: Vec<i32>) -> AppResult<HashMap<i32, String>>;

    /// Insert a new user, sealing its personal fields
    async fn create(&self, record: NewUserRecord) -> AppResult<User>;

    /// Update user fields, sealing any personal field that changes
    async fn update(&self, id: i32, changes: UserChanges) -> AppResult<User>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
    cipher: FieldCipher,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection, cipher: FieldCipher) -> Self {
        Self { db, cipher }
    }

    /// Decrypt a row into a domain user.
    fn open(&self, model: user::Model) -> AppResult<User> {
        Ok(User {
            id: model.id,
            name: model.name,
            email: self.cipher.decrypt_optional(model.email_encrypted.as_deref())?,
            external_id: self
                .cipher
                .decrypt_optional(model.external_id_encrypted.as_deref())?,
            role: UserRole::from(model.is_admin),
            created_at: model.created_at,
        })
    }

    fn open_optional(&self, model: Option<user::Model>) -> AppResult<Option<User>> {
        model.map(|m| self.open(m)).transpose()
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        self.open_optional(result)
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let hash = self.cipher.blind_index(external_id)?;
        let result = UserEntity::find()
            .filter(user::Column::ExternalIdHash.eq(hash))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        self.open_optional(result)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let hash = self.cipher.blind_index(email)?;
        let result = UserEntity::find()
            .filter(user::Column::EmailHash.eq(hash))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        self.open_optional(result)
    }

    async fn names_by_ids(&self, ids: Vec<i32>) -> AppResult<HashMap<i32, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Names only; no need to decrypt anything
        let models = UserEntity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(|m| (m.id, m.name)).collect())
    }

    async fn create(&self, record: NewUserRecord) -> AppResult<User> {
        let email = self.cipher.seal_optional(record.email.as_deref())?;
        let external_id = self.cipher.seal_optional(record.external_id.as_deref())?;

        let active_model = ActiveModel {
            name: Set(record.name),
            email_encrypted: Set(email.as_ref().map(|s| s.ciphertext.clone())),
            email_hash: Set(email.map(|s| s.blind_index)),
            external_id_encrypted: Set(external_id.as_ref().map(|s| s.ciphertext.clone())),
            external_id_hash: Set(external_id.map(|s| s.blind_index)),
            is_admin: Set(record.is_admin),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        self.open(model)
    }

    async fn update(&self, id: i32, changes: UserChanges) -> AppResult<User> {
        let user = UserEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {}", id)))?;

        let mut active: ActiveModel = user.into();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(email) = changes.email {
            let sealed = self.cipher.seal(&email)?;
            active.email_encrypted = Set(Some(sealed.ciphertext));
            active.email_hash = Set(Some(sealed.blind_index));
        }
        if let Some(external_id) = changes.external_id {
            let sealed = self.cipher.seal(&external_id)?;
            active.external_id_encrypted = Set(Some(sealed.ciphertext));
            active.external_id_hash = Set(Some(sealed.blind_index));
        }

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        self.open(model)
    }
}
