use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{filter_value, DbError, SupabaseClient};

use crate::models::{
    AssignSpecialtiesRequest, CreateSpecialtyRequest, Specialty, UserError, UserWithSpecialties,
};

const USER_WITH_SPECIALTIES_SELECT: &str =
    "id,name,email,is_active,role:roles(id,name,description),specialties(id,name,description)";

pub struct SpecialtyService {
    db: Arc<SupabaseClient>,
}

impl SpecialtyService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self { db }
    }

    pub async fn list_specialties(&self) -> Result<Vec<Specialty>, UserError> {
        debug!("Listing specialties");
        Ok(self.db.select("specialties?select=id,name,description&order=name.asc").await?)
    }

    pub async fn create_specialty(&self, request: CreateSpecialtyRequest) -> Result<Specialty, UserError> {
        let name = request.name.trim().to_string();
        let description = request.description.trim().to_string();

        if name.is_empty() || description.is_empty() {
            return Err(UserError::ValidationError(
                "Name and description are required".to_string(),
            ));
        }

        let existing: Option<Specialty> = self
            .db
            .select_one(&format!("specialties?select=id,name,description&name=eq.{}", filter_value(&name)))
            .await?;
        if existing.is_some() {
            return Err(UserError::SpecialtyAlreadyExists(name));
        }

        let specialty: Specialty = self
            .db
            .insert("specialties", &json!({ "name": name, "description": description }))
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation(_) => UserError::SpecialtyAlreadyExists(name.clone()),
                other => other.into(),
            })?;

        info!("Created specialty {} ({})", specialty.name, specialty.id);
        Ok(specialty)
    }

    /// Replaces the user's specialty set in one transaction.
    pub async fn assign_specialties(
        &self,
        request: AssignSpecialtiesRequest,
    ) -> Result<UserWithSpecialties, UserError> {
        debug!(
            "Assigning {} specialties to user {}",
            request.specialties.len(),
            request.user_id
        );

        self.db
            .rpc::<serde_json::Value, _>(
                "assign_specialties",
                &json!({
                    "p_user_id": request.user_id,
                    "p_specialty_ids": request.specialties
                }),
            )
            .await
            .map_err(|e| match e {
                DbError::NotFound(_) => UserError::NotFound,
                DbError::ForeignKeyViolation(_) => UserError::SpecialtyNotFound,
                other => other.into(),
            })?;

        info!("Updated specialties of user {}", request.user_id);
        self.user_with_specialties(request.user_id).await
    }

    pub async fn user_with_specialties(&self, user_id: Uuid) -> Result<UserWithSpecialties, UserError> {
        let query = format!("users?select={}&id=eq.{}", USER_WITH_SPECIALTIES_SELECT, user_id);
        self.db
            .select_one(&query)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn users_with_specialties(&self) -> Result<Vec<UserWithSpecialties>, UserError> {
        debug!("Listing users with specialties");
        let query = format!("users?select={}&order=name.asc", USER_WITH_SPECIALTIES_SELECT);
        Ok(self.db.select(&query).await?)
    }
}
