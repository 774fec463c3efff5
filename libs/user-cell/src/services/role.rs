use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{filter_value, SupabaseClient};
use shared_models::auth::Role;

use crate::models::{RoleRecord, UserError};

pub struct RoleService {
    db: Arc<SupabaseClient>,
}

impl RoleService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self { db }
    }

    pub async fn list_roles(&self) -> Result<Vec<RoleRecord>, UserError> {
        debug!("Listing roles");
        Ok(self.db.select("roles?select=id,name,description&order=name.asc").await?)
    }

    pub async fn get_role(&self, id: Uuid) -> Result<RoleRecord, UserError> {
        let query = format!("roles?select=id,name,description&id=eq.{}", id);
        self.db
            .select_one(&query)
            .await?
            .ok_or(UserError::UnknownRoleId)
    }

    pub async fn role_id(&self, role: Role) -> Result<Uuid, UserError> {
        let query = format!(
            "roles?select=id,name,description&name=eq.{}",
            filter_value(role.as_str())
        );

        self.db
            .select_one::<RoleRecord>(&query)
            .await?
            .map(|record| record.id)
            .ok_or(UserError::RoleNotFound(role))
    }

    /// Idempotent: existing rows keep their ids.
    pub async fn seed_roles(&self) -> Result<(), UserError> {
        let rows: Vec<_> = Role::ALL
            .iter()
            .map(|role| json!({ "name": role.as_str(), "description": role.description() }))
            .collect();

        self.db.upsert("roles", "name", &rows).await?;
        info!("Seeded {} roles", rows.len());
        Ok(())
    }
}
