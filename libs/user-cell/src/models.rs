use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DbError;
use shared_models::auth::Role;
use shared_models::error::AppError;

/// PostgREST `select` that embeds the role row into every user.
pub const USER_SELECT: &str = "*,role:roles(id,name,description)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: Uuid,
    pub name: Role,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub insurance: Option<String>,
    pub is_active: bool,
    pub role_id: Uuid,
    pub role: Option<RoleRecord>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Role from the embedded row. Accounts without one are treated as patients.
    pub fn role_name(&self) -> Role {
        self.role.as_ref().map(|r| r.name).unwrap_or(Role::Paciente)
    }
}

/// Public view of an account returned next to an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            profile_picture: user.profile_picture.clone(),
            role: user.role_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub insurance: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub profile_picture: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub insurance: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Fields only an administrator may change.
    pub fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }
}

/// Account data extracted from a verified Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialty {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSpecialtyRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignSpecialtiesRequest {
    pub user_id: Uuid,
    pub specialties: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithSpecialties {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub role: Option<RoleRecord>,
    #[serde(default)]
    pub specialties: Vec<Specialty>,
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("User with email {email} already exists")]
    EmailAlreadyExists { email: String },

    #[error("Role {0} is not registered")]
    RoleNotFound(Role),

    #[error("Role not found")]
    UnknownRoleId,

    #[error("Specialty not found")]
    SpecialtyNotFound,

    #[error("Specialty {0} already exists")]
    SpecialtyAlreadyExists(String),

    #[error("Only administrators may change role or status")]
    PrivilegedUpdate,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Failed to hash password")]
    PasswordHash,

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::SpecialtyNotFound | UserError::UnknownRoleId => {
                AppError::NotFound(err.to_string())
            }
            UserError::EmailAlreadyExists { .. } | UserError::SpecialtyAlreadyExists(_) => {
                AppError::Conflict(err.to_string())
            }
            UserError::RoleNotFound(_) => AppError::Internal(err.to_string()),
            UserError::PrivilegedUpdate => AppError::Forbidden(err.to_string()),
            UserError::ValidationError(msg) => AppError::ValidationError(msg),
            UserError::PasswordHash => AppError::Internal(err.to_string()),
            UserError::Database(db) => db.into(),
        }
    }
}
