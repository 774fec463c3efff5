use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expiration_hours: 24,
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_certs_url: format!("{}/oauth2/v3/certs", self.supabase_url),
            port: 0,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }

    /// Config whose store and Google certs both point at a mock server.
    pub fn with_mock_server(uri: &str) -> AppConfig {
        Self {
            supabase_url: uri.to_string(),
            ..Self::default()
        }
        .to_app_config()
    }
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", Role::Paciente)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Medico)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Paciente)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn secretary(email: &str) -> Self {
        Self::new(email, Role::Secretaria)
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp().max(0)
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row shapes as PostgREST returns them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn role_response(role: Role) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "name": role,
            "description": role.description()
        })
    }

    pub fn user_response(user_id: Uuid, name: &str, email: &str, role: Role, is_active: bool) -> Value {
        let role_row = Self::role_response(role);
        json!({
            "id": user_id,
            "name": name,
            "email": email,
            "google_id": null,
            "profile_picture": null,
            "cpf": null,
            "phone": null,
            "date_of_birth": "1990-01-01",
            "gender": null,
            "insurance": null,
            "is_active": is_active,
            "role_id": role_row["id"].clone(),
            "role": role_row,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn user_with_password(user_id: Uuid, email: &str, role: Role, password_hash: &str) -> Value {
        let mut user = Self::user_response(user_id, "Test User", email, role, true);
        user["password_hash"] = json!(password_hash);
        user
    }

    pub fn schedule_response(schedule_id: Uuid, user_id: Uuid, doctor_id: Uuid, status: &str) -> Value {
        json!({
            "id": schedule_id,
            "user_id": user_id,
            "doctor_id": doctor_id,
            "date": "2030-01-15",
            "time": "09:30",
            "type": "consulta",
            "notes": null,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn attendance_response(
        attendance_id: Uuid,
        schedule_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        status: &str,
    ) -> Value {
        json!({
            "id": attendance_id,
            "schedule_id": schedule_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "symptoms": "",
            "diagnosis": null,
            "prescription": null,
            "observations": null,
            "status": status,
            "cancellation_reason": null,
            "started_at": "2024-01-01T09:30:00Z",
            "completed_at": null,
            "created_at": "2024-01-01T09:30:00Z",
            "updated_at": "2024-01-01T09:30:00Z"
        })
    }

    pub fn medicine_response(medicine_id: Uuid, manufacturer_id: Uuid, quantity: i32, minimum: i32) -> Value {
        json!({
            "id": medicine_id,
            "commercial_name": "Dipirona 500mg",
            "generic_name": "Dipirona sódica",
            "manufacturer_id": manufacturer_id,
            "batch": "L2024-001",
            "quantity_in_stock": quantity,
            "minimum_quantity": minimum,
            "expiry_date": "2030-12-31",
            "storage_location": "Farmácia A1",
            "active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn manufacturer_response(manufacturer_id: Uuid, name: &str) -> Value {
        json!({
            "id": manufacturer_id,
            "name": name,
            "anvisa_registration": "1.0000.0000",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(code: &str, message: &str) -> Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_service_key, "test-service-key");
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, Role::Medico);
    }

    #[test]
    fn test_jwt_token_accepted_by_validator() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert_eq!(token.split('.').count(), 3);
        let validated = validate_token(&token, secret).unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role, Role::Paciente);
    }
}
