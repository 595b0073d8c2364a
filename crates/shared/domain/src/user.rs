//! User domain entity and identity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_NAME_LENGTH;
use crate::error::{DomainError, DomainResult};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl From<bool> for UserRole {
    fn from(is_admin: bool) -> Self {
        if is_admin {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

/// User domain entity with sensitive fields already decrypted.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub external_id: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

// Personal fields stay out of logs
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("external_id", &self.external_id.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .finish()
    }
}

impl User {
    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Who is acting: the input to identity resolution.
///
/// Direct donation actions only know a display name; the login flow also
/// carries the provider subject id and email.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub display_name: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("external_id", &self.external_id.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl Identity {
    /// Identity known only by display name.
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            external_id: None,
            email: None,
            display_name: display_name.into(),
        }
    }

    /// Identity coming from an external login provider.
    pub fn external(
        external_id: impl Into<String>,
        email: Option<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            external_id: Some(external_id.into()),
            email,
            display_name: display_name.into(),
        }
    }

    /// Whether this identity carries anything besides a display name.
    pub fn has_stable_key(&self) -> bool {
        self.external_id.is_some() || self.email.is_some()
    }

    /// Trim fields and drop blank optional values.
    pub fn normalized(self) -> DomainResult<Self> {
        let display_name = normalize_display_name(&self.display_name)?;
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        Ok(Self {
            external_id: blank_to_none(self.external_id),
            email: blank_to_none(self.email),
            display_name,
        })
    }
}

/// Trim a display name and check it is usable.
pub fn normalize_display_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("Display name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Display name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Candidate display names in the order they are tried: `name`, `name1`, … `name{max}`.
pub fn name_candidates(base: &str, max_suffix: u32) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain((1..=max_suffix).map(move |i| format!("{}{}", base, i)))
}
