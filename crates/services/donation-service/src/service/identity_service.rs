//! Identity service - Finds or creates the user behind an identity.
//!
//! Users are created lazily the first time a name or login identity shows up
//! in a donate, claim or request call.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use common::{AppError, AppResult};
use domain::{name_candidates, Identity, User, MAX_NAME_SUFFIX_ATTEMPTS};

use crate::repository::{NewUserRecord, UserChanges, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Identity service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Return the user for an identity, creating or refreshing it as needed.
    ///
    /// Lookup goes by external identity, then email, then (for name-only
    /// identities) exact display name.
    async fn resolve(&self, identity: Identity) -> AppResult<User>;
}

/// Concrete implementation of IdentityService using the user repository.
pub struct IdentityResolver {
    repo: Arc<dyn UserRepository>,
    admin_email: Option<String>,
}

impl IdentityResolver {
    /// Create new resolver; users created with `admin_email` get the admin flag
    pub fn new(repo: Arc<dyn UserRepository>, admin_email: Option<String>) -> Self {
        Self { repo, admin_email }
    }

    fn is_admin_email(&self, email: Option<&str>) -> bool {
        match (self.admin_email.as_deref(), email) {
            (Some(admin), Some(email)) => admin.eq_ignore_ascii_case(email),
            _ => false,
        }
    }

    async fn find_existing(&self, identity: &Identity) -> AppResult<Option<User>> {
        if let Some(external_id) = identity.external_id.as_deref() {
            if let Some(user) = self.repo.find_by_external_id(external_id).await? {
                return Ok(Some(user));
            }
        }

        if let Some(email) = identity.email.as_deref() {
            if let Some(user) = self.repo.find_by_email(email).await? {
                return Ok(Some(user));
            }
        }

        if identity.has_stable_key() {
            return Ok(None);
        }

        self.repo.find_by_name(&identity.display_name).await
    }

    async fn create(&self, identity: &Identity) -> AppResult<User> {
        let is_admin = self.is_admin_email(identity.email.as_deref());

        for candidate in name_candidates(&identity.display_name, MAX_NAME_SUFFIX_ATTEMPTS) {
            if self.repo.find_by_name(&candidate).await?.is_some() {
                continue;
            }

            let record = NewUserRecord {
                name: candidate.clone(),
                email: identity.email.clone(),
                external_id: identity.external_id.clone(),
                is_admin,
            };

            match self.repo.create(record).await {
                Ok(user) => {
                    info!(user_id = user.id, name = %user.name, admin = is_admin, "Created user");
                    return Ok(user);
                }
                Err(e) if e.is_unique_violation() => {
                    // Someone else inserted this identity or took the name meanwhile
                    if let Some(user) = self.find_existing(identity).await? {
                        return Ok(user);
                    }
                    debug!(candidate = %candidate, "Display name taken concurrently");
                }
                Err(e) => return Err(e),
            }
        }

        Err(exhausted(&identity.display_name))
    }

    /// Bring an existing user in line with the identity it was found by.
    async fn refresh(&self, user: User, identity: &Identity) -> AppResult<User> {
        let mut changes = UserChanges::default();

        if user.name != identity.display_name {
            let name = self.pick_name(&identity.display_name, user.id).await?;
            if name != user.name {
                changes.name = Some(name);
            }
        }
        if identity.external_id.is_some() && identity.external_id != user.external_id {
            changes.external_id = identity.external_id.clone();
        }
        if identity.email.is_some() && identity.email != user.email {
            changes.email = identity.email.clone();
        }

        if changes.is_empty() {
            return Ok(user);
        }

        let updated = self.repo.update(user.id, changes).await?;
        info!(user_id = updated.id, name = %updated.name, "Updated user from identity");
        Ok(updated)
    }

    /// First free candidate name; one already held by `owner_id` counts as free.
    async fn pick_name(&self, base: &str, owner_id: i32) -> AppResult<String> {
        for candidate in name_candidates(base, MAX_NAME_SUFFIX_ATTEMPTS) {
            match self.repo.find_by_name(&candidate).await? {
                None => return Ok(candidate),
                Some(existing) if existing.id == owner_id => return Ok(candidate),
                Some(_) => continue,
            }
        }

        Err(exhausted(base))
    }
}

fn exhausted(name: &str) -> AppError {
    AppError::NameExhausted {
        name: name.to_string(),
        attempts: MAX_NAME_SUFFIX_ATTEMPTS,
    }
}

#[async_trait]
impl IdentityService for IdentityResolver {
    async fn resolve(&self, identity: Identity) -> AppResult<User> {
        let identity = identity.normalized()?;

        match self.find_existing(&identity).await? {
            Some(user) if identity.has_stable_key() => self.refresh(user, &identity).await,
            Some(user) => Ok(user),
            None => self.create(&identity).await,
        }
    }
}
