use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{filter_value, SupabaseClient};
use shared_models::auth::Role;

use crate::models::{
    CreateUserRequest, GoogleProfile, UpdateUserRequest, User, UserError, USER_SELECT,
};
use crate::services::password::hash_password;
use crate::services::role::RoleService;

pub struct UserService {
    db: Arc<SupabaseClient>,
    roles: RoleService,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), UserError> {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(UserError::ValidationError(format!("Invalid email: {}", email)))
    }
}

impl UserService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self {
            roles: RoleService::new(db.clone()),
            db,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, UserError> {
        debug!("Listing users");
        let query = format!("users?select={}&order=name.asc", USER_SELECT);
        Ok(self.db.select(&query).await?)
    }

    /// Active accounts holding the MEDICO role, by name.
    pub async fn list_doctors(&self) -> Result<Vec<User>, UserError> {
        debug!("Listing doctors");
        let query = format!(
            "users?select=*,role:roles!inner(id,name,description)&role.name=eq.{}&is_active=eq.true&order=name.asc",
            Role::Medico.as_str()
        );
        Ok(self.db.select(&query).await?)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, UserError> {
        let query = format!("users?select={}&id=eq.{}", USER_SELECT, user_id);
        Ok(self.db.select_one(&query).await?)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, UserError> {
        debug!("Fetching user: {}", user_id);
        self.find_by_id(user_id).await?.ok_or(UserError::NotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let query = format!(
            "users?select={}&email=eq.{}",
            USER_SELECT,
            filter_value(&normalize_email(email))
        );
        Ok(self.db.select_one(&query).await?)
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserError> {
        let email = normalize_email(&request.email);
        let name = request.name.trim().to_string();

        if name.is_empty() {
            return Err(UserError::ValidationError("Name is required".to_string()));
        }
        validate_email(&email)?;

        debug!("Creating user: {}", email);

        if self.find_by_email(&email).await?.is_some() {
            warn!("Rejected duplicate account for {}", email);
            return Err(UserError::EmailAlreadyExists { email });
        }

        let role = request.role.unwrap_or(Role::Paciente);
        let role_id = self.roles.role_id(role).await?;

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "name": name,
            "email": email,
            "password_hash": password_hash,
            "role_id": role_id,
            "cpf": request.cpf,
            "phone": request.phone,
            "date_of_birth": request.date_of_birth,
            "gender": request.gender,
            "insurance": request.insurance,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        let user: User = self
            .db
            .insert(&format!("users?select={}", USER_SELECT), &row)
            .await
            .map_err(|e| match e {
                shared_database::DbError::UniqueViolation(_) => {
                    UserError::EmailAlreadyExists { email: email.clone() }
                }
                other => other.into(),
            })?;

        info!("Created user {} with role {}", user.id, role);
        Ok(user)
    }

    /// First Google sign-in for an unknown email: a patient account without
    /// a password.
    pub async fn provision_google_user(&self, profile: &GoogleProfile) -> Result<User, UserError> {
        let email = normalize_email(&profile.email);
        let role_id = self.roles.role_id(Role::Paciente).await?;

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "name": profile.name,
            "email": email,
            "google_id": profile.google_id,
            "profile_picture": profile.picture,
            "role_id": role_id,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        let user: User = self
            .db
            .insert(&format!("users?select={}", USER_SELECT), &row)
            .await?;

        info!("Provisioned patient account {} from Google sign-in", user.id);
        Ok(user)
    }

    /// Refreshes name, picture and google id when the Google profile changed.
    pub async fn sync_google_profile(&self, user: User, profile: &GoogleProfile) -> Result<User, UserError> {
        let mut changes = Map::new();

        if user.name != profile.name {
            changes.insert("name".to_string(), json!(profile.name));
        }
        if profile.picture.is_some() && user.profile_picture != profile.picture {
            changes.insert("profile_picture".to_string(), json!(profile.picture));
        }
        if user.google_id.as_deref() != Some(profile.google_id.as_str()) {
            changes.insert("google_id".to_string(), json!(profile.google_id));
        }

        if changes.is_empty() {
            return Ok(user);
        }

        debug!("Refreshing Google profile fields for {}", user.id);
        self.apply_update(user.id, changes).await
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<User, UserError> {
        debug!("Updating user: {}", user_id);

        let mut changes = Map::new();

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(UserError::ValidationError("Name cannot be empty".to_string()));
            }
            changes.insert("name".to_string(), json!(name));
        }
        if let Some(email) = request.email {
            let email = normalize_email(&email);
            validate_email(&email)?;
            if let Some(other) = self.find_by_email(&email).await? {
                if other.id != user_id {
                    return Err(UserError::EmailAlreadyExists { email });
                }
            }
            changes.insert("email".to_string(), json!(email));
        }
        if let Some(password) = request.password {
            let password_hash = hash_password(&password)?;
            changes.insert("password_hash".to_string(), json!(password_hash));
        }
        if let Some(role) = request.role {
            let role_id = self.roles.role_id(role).await?;
            changes.insert("role_id".to_string(), json!(role_id));
        }
        if let Some(picture) = request.profile_picture {
            changes.insert("profile_picture".to_string(), json!(picture));
        }
        if let Some(cpf) = request.cpf {
            changes.insert("cpf".to_string(), json!(cpf));
        }
        if let Some(phone) = request.phone {
            changes.insert("phone".to_string(), json!(phone));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            changes.insert("date_of_birth".to_string(), json!(date_of_birth));
        }
        if let Some(gender) = request.gender {
            changes.insert("gender".to_string(), json!(gender));
        }
        if let Some(insurance) = request.insurance {
            changes.insert("insurance".to_string(), json!(insurance));
        }
        if let Some(is_active) = request.is_active {
            changes.insert("is_active".to_string(), json!(is_active));
        }

        if changes.is_empty() {
            return self.get_user(user_id).await;
        }

        self.apply_update(user_id, changes).await
    }

    pub async fn deactivate_user(&self, user_id: Uuid) -> Result<User, UserError> {
        let mut changes = Map::new();
        changes.insert("is_active".to_string(), json!(false));

        let user = self.apply_update(user_id, changes).await?;
        info!("Deactivated user {}", user_id);
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), UserError> {
        let deleted: Vec<Value> = self
            .db
            .delete(&format!("users?id=eq.{}", user_id))
            .await?;

        if deleted.is_empty() {
            return Err(UserError::NotFound);
        }

        info!("Deleted user {}", user_id);
        Ok(())
    }

    async fn apply_update(&self, user_id: Uuid, mut changes: Map<String, Value>) -> Result<User, UserError> {
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let query = format!("users?id=eq.{}&select={}", user_id, USER_SELECT);
        let updated: Vec<User> = self.db.update(&query, &Value::Object(changes)).await?;

        updated.into_iter().next().ok_or(UserError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Clinic.TEST "), "ana@clinic.test");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@clinic.test").is_ok());
        assert!(validate_email("ana@clinic").is_err());
        assert!(validate_email("@clinic.test").is_err());
        assert!(validate_email("ana.clinic.test").is_err());
    }
}
